use std::collections::HashMap;

use anyhow::{ensure, Result};
use helper_functions::predicates;
use itertools::Itertools as _;
use log::debug;
use parking_lot::Mutex;
use types::phase0::{
    containers::{Attestation, AttestationData},
    primitives::ValidatorIndex,
};

use crate::error::Error;

/// Collects attestations extracted from block bodies so that fork choice can weigh them later.
pub trait AttestationPool: Send + Sync {
    fn save_block_attestations(&self, attestations: &[Attestation]) -> Result<()>;

    /// Removes all attestations from the pool.
    fn drain(&self) -> Vec<Attestation>;
}

type AttestationMap = HashMap<AttestationData, Vec<Attestation>>;

/// Groups attestations by the data they sign.
///
/// An attestation whose attesters are all covered by another attestation with the same data adds
/// nothing and is not stored. Storing an attestation removes the ones it covers.
#[derive(Default)]
pub struct InMemoryAttestationPool {
    attestations: Mutex<AttestationMap>,
}

impl AttestationPool for InMemoryAttestationPool {
    fn save_block_attestations(&self, attestations: &[Attestation]) -> Result<()> {
        // Validate everything first so that a bad attestation leaves the pool unchanged.
        for attestation in attestations {
            validate(attestation)?;
        }

        let mut map = self.attestations.lock();

        for attestation in attestations {
            let stored = map.entry(attestation.data).or_default();

            let covered = stored.iter().any(|existing| {
                is_subset(&attestation.attesting_indices, &existing.attesting_indices)
            });

            if covered {
                continue;
            }

            stored.retain(|existing| {
                !is_subset(&existing.attesting_indices, &attestation.attesting_indices)
            });

            stored.push(attestation.clone());
        }

        debug!(
            "saved block attestations (count: {}, pool size: {})",
            attestations.len(),
            map.values().map(Vec::len).sum::<usize>(),
        );

        Ok(())
    }

    /// Attestations are returned ordered by their data.
    fn drain(&self) -> Vec<Attestation> {
        core::mem::take(&mut *self.attestations.lock())
            .into_iter()
            .sorted_unstable_by_key(|(data, _)| *data)
            .flat_map(|(_, attestations)| attestations)
            .collect()
    }
}

impl InMemoryAttestationPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attestations.lock().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn attestations_for(&self, data: &AttestationData) -> Vec<Attestation> {
        self.attestations
            .lock()
            .get(data)
            .cloned()
            .unwrap_or_default()
    }
}

fn validate(attestation: &Attestation) -> Result<()> {
    ensure!(
        !attestation.attesting_indices.is_empty(),
        Error::AttestationHasNoAttestingIndices {
            attestation: Box::new(attestation.clone()),
        },
    );

    ensure!(
        predicates::is_sorted_and_unique(&attestation.attesting_indices),
        Error::AttestingIndicesNotSortedAndUnique {
            attestation: Box::new(attestation.clone()),
        },
    );

    Ok(())
}

// Both slices must be sorted.
fn is_subset(subset: &[ValidatorIndex], superset: &[ValidatorIndex]) -> bool {
    subset
        .iter()
        .all(|index| superset.binary_search(index).is_ok())
}
