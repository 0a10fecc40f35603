//! Access-check capability.
//!
//! The permission subsystem lives outside this crate; the tree only consults
//! it through this seam before reading, mutating, or deleting a node.

use crate::error::FsError;
use crate::fs::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Delete,
}

pub trait AccessCheck: Send + Sync {
    fn check(&self, node: &Node, op: Operation) -> Result<(), FsError>;
}

/// Default capability: everything is allowed.
pub struct PermitAll;

impl AccessCheck for PermitAll {
    fn check(&self, _node: &Node, _op: Operation) -> Result<(), FsError> {
        Ok(())
    }
}
