//! Forward-only neural-network building blocks: dense layers, activations,
//! weight initialisation, embedding tables and the tensor helpers used by the
//! message-passing layers.

pub mod activation;
pub mod dense;
pub mod embedding;
pub mod init;
pub mod tensor;

pub use activation::Activation;
pub use dense::{Dense, Mlp};
pub use embedding::Embedding;
pub use init::WeightInit;
pub use tensor::OrbitalTensor;
