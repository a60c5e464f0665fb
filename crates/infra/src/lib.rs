//! Infrastructure layer: object storage, dataset encoding, HTTP inference
//! clients, and the job driver that ties them to the engine.

pub mod dataset;
pub mod driver;
pub mod inference;
pub mod object_store;


pub use dataset::{DatasetError, DatasetIo};
pub use driver::{FileReport, JobDriver, JobError, JobReport};
pub use object_store::{
    HttpObjectStore, InMemoryObjectStore, LocalObjectStore, ObjectStore, ObjectStoreError, ObjectUri,
};
