use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw storage identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw storage identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

record_id!(
    /// Identifier of an authenticated buyer (user account).
    BuyerId
);

record_id!(
    /// Identifier of a buyer-owned shipping address.
    AddressId
);

record_id!(
    /// Identifier of a store that owns products.
    StoreId
);

record_id!(
    /// Identifier of a catalog category.
    CategoryId
);

record_id!(
    /// Identifier of a live catalog product.
    ProductId
);

record_id!(
    /// Identifier of a frozen product snapshot.
    SnapshotId
);

record_id!(
    /// Identifier of an order header.
    OrderId
);

record_id!(
    /// Identifier of a single order line.
    OrderLineId
);
