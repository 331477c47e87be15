//! Machine image resolution
//!
//! Pools reference images abstractly by name and version. The cloud profile
//! catalog maps those to a Glance image id per region and architecture, or to
//! a Glance image name. Images that were removed from the catalog stay usable
//! through the worker status of earlier passes.

use lattice_common::crd::openstack::{
    CloudProfileConfig, MachineImage, WorkerStatus, DEFAULT_ARCHITECTURE,
};
use lattice_common::crd::MachineImageRef;
use lattice_common::{Error, Result};

/// How a resolved image is addressed in Glance
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageReference {
    /// Glance image id, from a region mapping
    Id(String),
    /// Glance image name
    Name(String),
}

/// An image resolved for one pool
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedImage {
    /// The image reference used by the machine class
    pub reference: ImageReference,
    /// Architecture the image was resolved for
    pub architecture: String,
}

impl ResolvedImage {
    /// Glance image id, if resolved by id
    pub fn id(&self) -> Option<&str> {
        match &self.reference {
            ImageReference::Id(id) => Some(id),
            ImageReference::Name(_) => None,
        }
    }

    /// Glance image name, if resolved by name
    pub fn name(&self) -> Option<&str> {
        match &self.reference {
            ImageReference::Name(name) => Some(name),
            ImageReference::Id(_) => None,
        }
    }

    /// Status entry recording this resolution for `image`
    pub fn status_entry(&self, image: &MachineImageRef) -> MachineImage {
        MachineImage {
            name: image.name.clone(),
            version: image.version.clone(),
            image: self.name().map(str::to_string),
            id: self.id().map(str::to_string),
            architecture: Some(self.architecture.clone()),
        }
    }
}

/// Look up an image in the cloud profile catalog
///
/// A region mapping for `region` and `architecture` wins over the version's
/// image name. Mappings without an architecture count as amd64.
pub fn find_in_catalog(
    catalog: &CloudProfileConfig,
    image: &MachineImageRef,
    region: &str,
    architecture: &str,
) -> Option<ResolvedImage> {
    let version = catalog
        .machine_images
        .iter()
        .filter(|candidate| candidate.name == image.name)
        .flat_map(|candidate| candidate.versions.iter())
        .find(|candidate| candidate.version == image.version)?;

    let mapped_id = version
        .regions
        .iter()
        .find(|mapping| {
            mapping.name == region
                && mapping.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE) == architecture
        })
        .map(|mapping| ImageReference::Id(mapping.id.clone()));

    let reference = match mapped_id {
        Some(id) => id,
        None if !version.image.is_empty() => ImageReference::Name(version.image.clone()),
        None => return None,
    };

    Some(ResolvedImage {
        reference,
        architecture: architecture.to_string(),
    })
}

/// Look up an image recorded by an earlier pass
pub fn find_in_status(
    status: &WorkerStatus,
    image: &MachineImageRef,
    architecture: &str,
) -> Option<ResolvedImage> {
    status
        .machine_images
        .iter()
        .filter(|known| {
            known.name == image.name
                && known.version == image.version
                && known.architecture.as_deref().unwrap_or(DEFAULT_ARCHITECTURE) == architecture
        })
        .find_map(|known| {
            let reference = match (&known.id, &known.image) {
                (Some(id), _) if !id.is_empty() => ImageReference::Id(id.clone()),
                (_, Some(name)) if !name.is_empty() => ImageReference::Name(name.clone()),
                _ => return None,
            };
            Some(ResolvedImage {
                reference,
                architecture: architecture.to_string(),
            })
        })
}

/// Resolve the image of `pool_name`, catalog first, then earlier status
pub fn resolve_machine_image(
    catalog: &CloudProfileConfig,
    previous: Option<&WorkerStatus>,
    image: &MachineImageRef,
    region: &str,
    architecture: &str,
    pool_name: &str,
) -> Result<ResolvedImage> {
    find_in_catalog(catalog, image, region, architecture)
        .or_else(|| previous.and_then(|status| find_in_status(status, image, architecture)))
        .ok_or_else(|| {
            Error::resolution_for(
                pool_name,
                format!(
                    "could not find machine image for {}/{} (architecture {}, region {}) for pool {:?}: neither in cloud profile nor in worker status",
                    image.name, image.version, architecture, region, pool_name
                ),
            )
        })
}

/// Add a status entry unless an equal image is already listed
pub fn append_machine_image(images: &mut Vec<MachineImage>, entry: MachineImage) {
    let duplicate = images.iter().any(|known| {
        known.name == entry.name
            && known.version == entry.version
            && known.architecture == entry.architecture
    });
    if !duplicate {
        images.push(entry);
    }
}
