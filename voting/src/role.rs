//! Caller gates evaluated at the top of every gated operation.

use crate::error::VotingError;
use crate::participants::ParticipantRegistry;
use crate::proposal::Proposal;
use qvote_types::Address;

/// A role a caller must hold, together with what is needed to check it.
pub enum Role<'a> {
    /// The session owner.
    Owner(&'a Address),
    /// Any active participant.
    Participant(&'a ParticipantRegistry),
    /// The creator of a specific proposal.
    Creator(&'a Proposal),
}

impl Role<'_> {
    /// Fail with the role's error unless `caller` holds it.
    pub fn check(&self, caller: &Address) -> Result<(), VotingError> {
        match self {
            Role::Owner(owner) => {
                if caller == *owner {
                    Ok(())
                } else {
                    Err(VotingError::NotOwner(caller.clone()))
                }
            }
            Role::Participant(registry) => registry.ensure_active(caller),
            Role::Creator(proposal) => {
                if *caller == proposal.creator {
                    Ok(())
                } else {
                    Err(VotingError::NotCreator {
                        proposal: proposal.id,
                        caller: caller.clone(),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_gate() {
        let owner = Address::from_index(1);
        assert!(Role::Owner(&owner).check(&owner).is_ok());
        assert_eq!(
            Role::Owner(&owner).check(&Address::from_index(2)),
            Err(VotingError::NotOwner(Address::from_index(2)))
        );
    }

    #[test]
    fn creator_gate() {
        let creator = Address::from_index(3);
        let proposal = Proposal::new(7, "t", "d", 0, Address::from_index(9), creator.clone());
        assert!(Role::Creator(&proposal).check(&creator).is_ok());
        assert!(matches!(
            Role::Creator(&proposal).check(&Address::from_index(4)),
            Err(VotingError::NotCreator { proposal: 7, .. })
        ));
    }
}
