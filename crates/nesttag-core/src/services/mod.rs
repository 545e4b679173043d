/// Backend services behind async traits, each with an AWS implementation
pub mod box_ids;
pub mod boxes;
pub mod cdn;
pub mod identity;
pub mod labels;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod storage;

pub use box_ids::{BoxIdRegistry, DynamoBoxIdRegistry};
pub use boxes::{BoxStore, DynamoBoxStore};
pub use cdn::{CdnSigner, CloudFrontSigner};
pub use identity::{CognitoIdentityProvider, IdentityProvider};
pub use labels::{DynamoLabelStore, LabelStore};
pub use storage::{ObjectStorage, S3ObjectStorage};

#[cfg(any(test, feature = "test-util"))]
pub use memory::{
    InMemoryBoxIdRegistry, InMemoryBoxStore, InMemoryIdentityProvider, InMemoryLabelStore,
    InMemoryObjectStorage, PresignedUpload, StoredObject,
};
