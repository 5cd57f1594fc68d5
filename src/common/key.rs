use crate::common::Item;

use aws_sdk_dynamodb::types;

/// Attribute name of the partition key.
pub const PARTITION_KEY: &str = "PK";

/// Attribute name of the sort key.
pub const SORT_KEY: &str = "SK";

/// Composite primary key of one item.
///
/// Rendered on the wire as two string attributes named [`PARTITION_KEY`] and [`SORT_KEY`].
///
/// ```rust
/// use dynamodb_service::common::key;
///
/// let key = key::PrimaryKey::new("Test#id1", "Test");
/// assert_eq!(key.partition(), "Test#id1");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PrimaryKey {
    partition: String,
    sort: String,
}

impl PrimaryKey {
    /// Create a key from its partition and sort values.
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    /// The partition key value.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// The sort key value.
    pub fn sort(&self) -> &str {
        &self.sort
    }
}

impl From<PrimaryKey> for Item {
    fn from(key: PrimaryKey) -> Self {
        Self::from([
            (
                PARTITION_KEY.to_string(),
                types::AttributeValue::S(key.partition),
            ),
            (SORT_KEY.to_string(), types::AttributeValue::S(key.sort)),
        ])
    }
}

impl From<&PrimaryKey> for Item {
    fn from(key: &PrimaryKey) -> Self {
        key.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::plain(
        PrimaryKey::new("a", "b"),
        Item::from(
            [
                (
                    "PK".to_string(),
                    types::AttributeValue::S(
                        "a".to_string()
                    )
                ),
                (
                    "SK".to_string(),
                    types::AttributeValue::S(
                        "b".to_string()
                    )
                ),
            ]
        )
    )]
    #[case::empty_sort_key(
        PrimaryKey::new("Test#id1", ""),
        Item::from(
            [
                (
                    "PK".to_string(),
                    types::AttributeValue::S(
                        "Test#id1".to_string()
                    )
                ),
                (
                    "SK".to_string(),
                    types::AttributeValue::S(
                        "".to_string()
                    )
                ),
            ]
        )
    )]
    fn test_primary_key_to_item(#[case] key: PrimaryKey, #[case] expected: Item) {
        let borrowed: Item = (&key).into();
        let actual: Item = key.into();
        assert_eq!(actual, expected);
        assert_eq!(borrowed, expected);
    }
}
