//! Conversion between application records and attribute maps.

use crate::common::Item;
use crate::error::Result;

use serde::{Serialize, de::DeserializeOwned};

/// Converts records to and from [`Item`]s.
///
/// Failures surface as [`Error::Codec`](crate::error::Error::Codec).
pub trait Codec: Send + Sync {
    /// Encode one record.
    fn encode<T: Serialize>(&self, record: &T) -> Result<Item>;

    /// Decode one record.
    fn decode<T: DeserializeOwned>(&self, item: Item) -> Result<T>;

    /// Encode records in order.
    fn encode_list<T: Serialize>(&self, records: &[T]) -> Result<Vec<Item>> {
        records.iter().map(|record| self.encode(record)).collect()
    }

    /// Decode items in order.
    fn decode_list<T: DeserializeOwned>(&self, items: Vec<Item>) -> Result<Vec<T>> {
        items.into_iter().map(|item| self.decode(item)).collect()
    }
}

/// [`Codec`] backed by `serde_dynamo`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DynamoCodec;

impl Codec for DynamoCodec {
    fn encode<T: Serialize>(&self, record: &T) -> Result<Item> {
        Ok(serde_dynamo::to_item(record)?)
    }

    fn decode<T: DeserializeOwned>(&self, item: Item) -> Result<T> {
        Ok(serde_dynamo::from_item(item)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use aws_sdk_dynamodb::types;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Record {
        #[serde(rename = "PK")]
        pk: String,
        #[serde(rename = "SK")]
        sk: String,
        count: u32,
    }

    #[test]
    fn test_encode_decode() {
        let record = Record {
            pk: "Test#id1".to_string(),
            sk: "Test".to_string(),
            count: 3,
        };
        let item = DynamoCodec.encode(&record).unwrap();
        assert_eq!(
            item.get("PK"),
            Some(&types::AttributeValue::S("Test#id1".to_string()))
        );
        assert_eq!(item.get("count"), Some(&types::AttributeValue::N("3".to_string())));
        let decoded: Record = DynamoCodec.decode(item).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_mismatch() {
        let item = Item::from([("PK".to_string(), types::AttributeValue::Bool(true))]);
        let actual: Result<Record> = DynamoCodec.decode(item);
        assert!(matches!(actual, Err(Error::Codec(_))));
    }

    #[test]
    fn test_encode_non_map() {
        let actual = DynamoCodec.encode(&"scalar");
        assert!(matches!(actual, Err(Error::Codec(_))));
    }
}
