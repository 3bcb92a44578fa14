//! Builders for the privileged calls and storage queries the setup issues.
//!
//! Calls are assembled dynamically against the node's metadata, so no generated runtime
//! bindings are needed. Bridge and balance administration is wrapped in `Sudo.sudo`;
//! asset creation is signed directly by the sudo account, which becomes the asset admin.
use std::fmt;

use subxt::dynamic::Value;
use subxt::tx::DynamicPayload;
use subxt::utils::AccountId32;

use crate::config::{AssetLocation, DestDomain, FeeHandlerType, Junction};

/// A fully parameterized extrinsic, optionally wrapped in `Sudo.sudo`.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pallet: &'static str,
    name: &'static str,
    args: Vec<Value>,
    inner: Option<Box<Call>>,
}

impl Call {
    /// Creates a call of `pallet::name` with positional arguments.
    pub fn new(
        pallet: &'static str,
        name: &'static str,
        args: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            pallet,
            name,
            args: args.into_iter().collect(),
            inner: None,
        }
    }

    /// Wraps this call so it is dispatched with root origin through the sudo pallet.
    pub fn sudo(self) -> Self {
        Self {
            pallet: "Sudo",
            name: "sudo",
            args: Vec::new(),
            inner: Some(Box::new(self)),
        }
    }

    /// Pallet of the outermost call.
    pub fn pallet(&self) -> &'static str {
        self.pallet
    }

    /// Name of the outermost call.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the call goes through `Sudo.sudo`.
    pub fn is_sudo(&self) -> bool {
        self.inner.is_some()
    }

    /// The call that is eventually dispatched, looking through any sudo wrapping.
    pub fn dispatched(&self) -> &Call {
        match &self.inner {
            Some(inner) => inner.dispatched(),
            None => self,
        }
    }

    /// Arguments of the outermost call.
    pub fn args(&self) -> Vec<Value> {
        match &self.inner {
            Some(inner) => vec![inner.runtime_call()],
            None => self.args.clone(),
        }
    }

    /// This call as a `RuntimeCall` value, used when it is nested in another call.
    fn runtime_call(&self) -> Value {
        Value::unnamed_variant(
            self.pallet,
            [Value::unnamed_variant(self.name, self.args())],
        )
    }

    /// The payload handed to the transaction client.
    pub fn payload(&self) -> DynamicPayload {
        subxt::dynamic::tx(self.pallet, self.name, self.args())
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => write!(f, "{}.{}({})", self.pallet, self.name, inner),
            None => write!(f, "{}.{}", self.pallet, self.name),
        }
    }
}

/// A read-only storage lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageQuery {
    /// Pallet holding the item.
    pub pallet: &'static str,
    /// Storage item name.
    pub entry: &'static str,
    /// Map keys, empty for plain values.
    pub keys: Vec<Value>,
}

/// `SygmaBridge.set_mpc_address`
pub fn set_mpc_address(address: [u8; 20]) -> Call {
    Call::new("SygmaBridge", "set_mpc_address", [Value::from_bytes(address)]).sudo()
}

/// `SygmaBridge.register_domain`
pub fn register_domain(domain: &DestDomain) -> Call {
    Call::new(
        "SygmaBridge",
        "register_domain",
        [
            Value::u128(domain.domain_id.into()),
            u256(domain.chain_id.into()),
        ],
    )
    .sudo()
}

/// `FeeHandlerRouter.set_fee_handler`
pub fn set_fee_handler(domain_id: u8, asset: &AssetLocation, handler: FeeHandlerType) -> Call {
    Call::new(
        "FeeHandlerRouter",
        "set_fee_handler",
        [
            Value::u128(domain_id.into()),
            asset_id(asset),
            Value::unnamed_variant(handler.variant_name(), []),
        ],
    )
    .sudo()
}

/// `SygmaBasicFeeHandler.set_fee`
pub fn set_fee(domain_id: u8, asset: &AssetLocation, amount: u128) -> Call {
    Call::new(
        "SygmaBasicFeeHandler",
        "set_fee",
        [Value::u128(domain_id.into()), asset_id(asset), Value::u128(amount)],
    )
    .sudo()
}

/// `Assets.create`, signed directly so the signer becomes owner.
pub fn create_asset(id: u32, admin: &AccountId32, min_balance: u128) -> Call {
    Call::new(
        "Assets",
        "create",
        [Value::u128(id.into()), multi_address(admin), Value::u128(min_balance)],
    )
}

/// `Assets.set_metadata`
pub fn set_asset_metadata(id: u32, name: &str, symbol: &str, decimals: u8) -> Call {
    Call::new(
        "Assets",
        "set_metadata",
        [
            Value::u128(id.into()),
            Value::from_bytes(name.as_bytes()),
            Value::from_bytes(symbol.as_bytes()),
            Value::u128(decimals.into()),
        ],
    )
}

/// `Assets.mint`
pub fn mint_asset(id: u32, beneficiary: &AccountId32, amount: u128) -> Call {
    Call::new(
        "Assets",
        "mint",
        [Value::u128(id.into()), multi_address(beneficiary), Value::u128(amount)],
    )
}

/// `Balances.set_balance` with no reserved balance.
pub fn set_balance(who: &AccountId32, free: u128) -> Call {
    Call::new(
        "Balances",
        "set_balance",
        [multi_address(who), Value::u128(free), Value::u128(0)],
    )
    .sudo()
}

/// `SygmaBridge.IsPaused` for one destination domain.
pub fn bridge_pause_status(domain_id: u8) -> StorageQuery {
    StorageQuery {
        pallet: "SygmaBridge",
        entry: "IsPaused",
        keys: vec![Value::u128(domain_id.into())],
    }
}

/// `System.Account`, which carries the account nonce.
pub fn system_account(account: &AccountId32) -> StorageQuery {
    StorageQuery {
        pallet: "System",
        entry: "Account",
        keys: vec![Value::from_bytes(account.0)],
    }
}

/// An XCM v1 `AssetId::Concrete` for the given location.
pub fn asset_id(location: &AssetLocation) -> Value {
    Value::unnamed_variant("Concrete", [multi_location(location)])
}

fn multi_location(location: &AssetLocation) -> Value {
    let interior = if location.interior.is_empty() {
        Value::unnamed_variant("Here", [])
    } else {
        let variant = match location.interior.len() {
            1 => "X1",
            2 => "X2",
            3 => "X3",
            4 => "X4",
            5 => "X5",
            6 => "X6",
            7 => "X7",
            _ => "X8",
        };
        Value::unnamed_variant(variant, location.interior.iter().map(junction))
    };

    Value::named_composite([
        ("parents", Value::u128(location.parents.into())),
        ("interior", interior),
    ])
}

fn junction(junction: &Junction) -> Value {
    match junction {
        Junction::Parachain(id) => {
            Value::unnamed_variant("Parachain", [Value::u128((*id).into())])
        }
        Junction::GeneralKey(key) => {
            Value::unnamed_variant("GeneralKey", [Value::from_bytes(key)])
        }
    }
}

/// `MultiAddress::Id`
fn multi_address(account: &AccountId32) -> Value {
    Value::unnamed_variant("Id", [Value::from_bytes(account.0)])
}

/// A `U256` as its four little-endian `u64` limbs.
fn u256(value: u128) -> Value {
    let limbs = [value as u64, (value >> 64) as u64, 0, 0];
    Value::unnamed_composite([Value::unnamed_composite(
        limbs.into_iter().map(|limb| Value::u128(limb.into())),
    )])
}

#[cfg(test)]
mod tests {
    use subxt_signer::sr25519::dev;

    use super::*;

    #[test]
    fn sudo_wraps_the_inner_call_as_a_runtime_call() {
        let call = register_domain(&DestDomain {
            domain_id: 1,
            chain_id: 1,
        });

        assert!(call.is_sudo());
        assert_eq!(call.pallet(), "Sudo");
        assert_eq!(call.name(), "sudo");
        assert_eq!(call.dispatched().pallet(), "SygmaBridge");
        assert_eq!(call.dispatched().name(), "register_domain");
        assert_eq!(call.to_string(), "Sudo.sudo(SygmaBridge.register_domain)");

        let expected = Value::unnamed_variant(
            "SygmaBridge",
            [Value::unnamed_variant(
                "register_domain",
                [Value::u128(1), u256(1)],
            )],
        );
        assert_eq!(call.args(), vec![expected]);
    }

    #[test]
    fn asset_calls_are_not_sudo_wrapped() {
        let alice = dev::alice().public_key().to_account_id();
        let call = create_asset(2000, &alice, 100);
        assert!(!call.is_sudo());
        assert_eq!(call.to_string(), "Assets.create");
        assert_eq!(call.args()[1], multi_address(&alice));
    }

    #[test]
    fn native_location_is_here() {
        let value = asset_id(&AssetLocation::native());
        let expected = Value::unnamed_variant(
            "Concrete",
            [Value::named_composite([
                ("parents", Value::u128(0)),
                ("interior", Value::unnamed_variant("Here", [])),
            ])],
        );
        assert_eq!(value, expected);
    }

    #[test]
    fn junction_count_selects_the_interior_variant() {
        let location = AssetLocation {
            parents: 1,
            interior: vec![
                Junction::Parachain(2004),
                Junction::GeneralKey(b"sygma".to_vec()),
                Junction::GeneralKey(b"usdc".to_vec()),
            ],
        };
        let expected = Value::named_composite([
            ("parents", Value::u128(1)),
            (
                "interior",
                Value::unnamed_variant(
                    "X3",
                    [
                        Value::unnamed_variant("Parachain", [Value::u128(2004)]),
                        Value::unnamed_variant("GeneralKey", [Value::from_bytes(b"sygma")]),
                        Value::unnamed_variant("GeneralKey", [Value::from_bytes(b"usdc")]),
                    ],
                ),
            ),
        ]);
        assert_eq!(multi_location(&location), expected);
    }

    #[test]
    fn u256_splits_into_little_endian_limbs() {
        let value = u256(u128::from(u64::MAX) + 2);
        let expected = Value::unnamed_composite([Value::unnamed_composite([
            Value::u128(1),
            Value::u128(1),
            Value::u128(0),
            Value::u128(0),
        ])]);
        assert_eq!(value, expected);
    }

    #[test]
    fn fee_handler_is_a_unit_variant() {
        let call = set_fee_handler(2, &AssetLocation::native(), FeeHandlerType::BasicFeeHandler);
        let dispatched = call.dispatched();
        assert_eq!(dispatched.to_string(), "FeeHandlerRouter.set_fee_handler");
        assert_eq!(
            dispatched.args()[2],
            Value::unnamed_variant("BasicFeeHandler", [])
        );
    }
}
