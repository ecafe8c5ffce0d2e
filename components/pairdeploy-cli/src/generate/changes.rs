#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileCreation {
    pub comment: String,
    pub name: String,
    pub content: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryCreation {
    pub comment: String,
    pub name: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Changes {
    AddFile(FileCreation),
    AddDirectory(DirectoryCreation),
}
