pub mod disk_state_repo;

pub use disk_state_repo::DiskStateRepo;
