pub mod directory;
pub mod seed;

pub use directory::DirectoryService;
pub use seed::DirectorySeedService;
