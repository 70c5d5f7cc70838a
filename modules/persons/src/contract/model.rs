/// A stored person. `id` is assigned by the database and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub email: String,
}

/// Every mutable field of a person; used for both create and full update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub name: String,
    pub age: i32,
    pub email: String,
}

impl NewPerson {
    pub fn with_id(self, id: i32) -> Person {
        Person {
            id,
            name: self.name,
            age: self.age,
            email: self.email,
        }
    }
}
