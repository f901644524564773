//! Configuration module for ssh-crypt
//!
//! This module provides configuration management including:
//! - Run settings assembled from the command line and environment
//! - Key path expansion and output file naming

pub mod paths;
pub mod settings;

pub use paths::{expand_tilde, ArtifactNames};
pub use settings::{Mode, Settings};
