//! Provider-specific API types embedded in the generic resources.
//!
//! Each provider module contains the documents its controllers exchange
//! through raw `providerConfig` / `providerStatus` fields.

pub mod openstack;
