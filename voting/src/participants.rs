//! The participation ledger: who may propose and stake.

use std::collections::BTreeMap;

use crate::error::VotingError;
use qvote_types::Address;
use serde::{Deserialize, Serialize};

/// An admitted address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: Address,
    /// True from admission until removal.
    pub active: bool,
    /// How many times `add_participant` succeeded for this address.
    pub admissions: u32,
}

/// Admitted participants, keyed by address.
///
/// Removal only deactivates; the record is kept so a later re-admission
/// continues the same history. A reserved address can never be admitted.
#[derive(Clone, Debug, Default)]
pub struct ParticipantRegistry {
    participants: BTreeMap<Address, Participant>,
    reserved: Option<Address>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that refuses `address`, the custody account of locked stakes.
    pub fn reserving(address: Address) -> Self {
        Self {
            participants: BTreeMap::new(),
            reserved: Some(address),
        }
    }

    /// Fail unless `address` may be admitted.
    pub fn ensure_admissible(&self, address: &Address) -> Result<(), VotingError> {
        if self.reserved.as_ref() == Some(address) {
            return Err(VotingError::NotAParticipant(address.clone()));
        }
        Ok(())
    }

    /// Activate `address`. Repeated admissions are allowed.
    /// Returns true if the address was not active before.
    pub fn admit(&mut self, address: &Address) -> Result<bool, VotingError> {
        self.ensure_admissible(address)?;
        let entry = self
            .participants
            .entry(address.clone())
            .or_insert_with(|| Participant {
                address: address.clone(),
                active: false,
                admissions: 0,
            });
        let newly_active = !entry.active;
        entry.active = true;
        entry.admissions = entry.admissions.saturating_add(1);
        Ok(newly_active)
    }

    /// Deactivate `address`. Token balances are not touched.
    pub fn remove(&mut self, address: &Address) -> Result<(), VotingError> {
        match self.participants.get_mut(address) {
            Some(p) if p.active => {
                p.active = false;
                Ok(())
            }
            _ => Err(VotingError::NotAParticipant(address.clone())),
        }
    }

    pub fn is_active(&self, address: &Address) -> bool {
        self.participants
            .get(address)
            .map_or(false, |p| p.active)
    }

    pub fn ensure_active(&self, address: &Address) -> Result<(), VotingError> {
        if self.is_active(address) {
            Ok(())
        } else {
            Err(VotingError::NotAParticipant(address.clone()))
        }
    }

    pub fn get(&self, address: &Address) -> Option<&Participant> {
        self.participants.get(address)
    }

    pub fn active_count(&self) -> usize {
        self.participants.values().filter(|p| p.active).count()
    }

    /// Every participant ever admitted, active or not.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> + '_ {
        self.participants.values()
    }
}
