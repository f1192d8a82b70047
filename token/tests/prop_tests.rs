use proptest::prelude::*;

use qvote_token::{TokenEngine, TokenLedger, TokenMetadata};
use qvote_types::Address;

#[derive(Clone, Debug)]
enum Op {
    Mint(u64, u128),
    Burn(u64, u128),
    Transfer(u64, u64, u128),
    Approve(u64, u64, u128),
    TransferFrom(u64, u64, u64, u128),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let who = 1u64..5;
    let amount = 0u128..1_000;
    prop_oneof![
        (who.clone(), amount.clone()).prop_map(|(a, n)| Op::Mint(a, n)),
        (who.clone(), amount.clone()).prop_map(|(a, n)| Op::Burn(a, n)),
        (who.clone(), who.clone(), amount.clone()).prop_map(|(a, b, n)| Op::Transfer(a, b, n)),
        (who.clone(), who.clone(), amount.clone()).prop_map(|(a, b, n)| Op::Approve(a, b, n)),
        (who.clone(), who.clone(), who, amount).prop_map(|(a, b, c, n)| Op::TransferFrom(a, b, c, n)),
    ]
}

proptest! {
    /// Supply always equals the sum of balances, whatever mix of calls succeeds or fails.
    #[test]
    fn supply_matches_balances(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut token = TokenEngine::new(TokenMetadata::default());
        for op in ops {
            let _ = match op {
                Op::Mint(a, n) => token.mint(&Address::from_index(a), n),
                Op::Burn(a, n) => token.burn(&Address::from_index(a), n),
                Op::Transfer(a, b, n) => {
                    token.transfer(&Address::from_index(a), &Address::from_index(b), n)
                }
                Op::Approve(a, b, n) => {
                    token.approve(&Address::from_index(a), &Address::from_index(b), n)
                }
                Op::TransferFrom(a, b, c, n) => token.transfer_from(
                    &Address::from_index(a),
                    &Address::from_index(b),
                    &Address::from_index(c),
                    n,
                ),
            };
            prop_assert_eq!(token.recompute_supply(), Some(token.total_supply()));
        }
    }

    /// A failed transfer_from changes neither balances nor the allowance.
    #[test]
    fn failed_transfer_from_is_atomic(balance in 0u128..100, approved in 0u128..100, amount in 0u128..200) {
        let mut token = TokenEngine::new(TokenMetadata::default());
        let owner = Address::from_index(1);
        let spender = Address::from_index(2);
        token.mint(&owner, balance).unwrap();
        token.approve(&owner, &spender, approved).unwrap();

        let result = token.transfer_from(&owner, &spender, &spender, amount);
        if amount <= balance && amount <= approved {
            prop_assert!(result.is_ok());
            prop_assert_eq!(token.balance_of(&owner), balance - amount);
            prop_assert_eq!(token.allowance(&owner, &spender), approved - amount);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(token.balance_of(&owner), balance);
            prop_assert_eq!(token.allowance(&owner, &spender), approved);
        }
    }
}
