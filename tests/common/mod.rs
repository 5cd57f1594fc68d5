//! In-memory backend for integration tests.
//!
//! Evaluates the expression forms the service renders: `attribute_exists`,
//! `attribute_not_exists`, `begins_with`, `=` and `<>` joined by `AND`, plain `SET`
//! assignments and `REMOVE`, and top-level projections.

#![allow(dead_code)]

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Error,
    operation::{
        batch_get_item::{BatchGetItemInput, BatchGetItemOutput},
        delete_item::{DeleteItemInput, DeleteItemOutput},
        get_item::{GetItemInput, GetItemOutput},
        put_item::{PutItemInput, PutItemOutput},
        query::{QueryInput, QueryOutput},
        transact_write_items::{
            TransactWriteItemsError, TransactWriteItemsInput, TransactWriteItemsOutput,
        },
        update_item::{UpdateItemInput, UpdateItemOutput},
    },
    types::{self, AttributeValue},
};
use dynamodb_service::{Service, backend::Backend, common::Item};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Table name used by every test.
pub const TABLE_NAME: &str = "test";

/// Record shape used by the scenario tests.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TestRecord {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
    #[serde(rename = "TestV")]
    pub value: String,
}

impl TestRecord {
    pub fn new(pk: &str, sk: &str, value: &str) -> Self {
        Self {
            pk: pk.to_string(),
            sk: sk.to_string(),
            value: value.to_string(),
        }
    }
}

type StoreKey = (String, String);

/// Calls received, by operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calls {
    pub get_item: usize,
    pub put_item: usize,
    pub update_item: usize,
    pub delete_item: usize,
    pub batch_get_item: usize,
    pub query: usize,
    pub transact_write_items: usize,
    /// Member count of every transact request.
    pub transact_sizes: Vec<usize>,
    /// Key count of every batch get request.
    pub batch_get_sizes: Vec<usize>,
}

#[derive(Default)]
pub struct MemoryBackend {
    store: Mutex<BTreeMap<StoreKey, Item>>,
    calls: Mutex<Calls>,
    fail_next: Mutex<Option<Error>>,
    leave_unprocessed: Mutex<bool>,
    cancel_after_query_page: Mutex<Option<CancellationToken>>,
}

/// A service over a fresh in-memory table.
pub fn service() -> Service<MemoryBackend> {
    Service::new(MemoryBackend::default(), TABLE_NAME)
}

fn store_key(item: &Item) -> StoreKey {
    let string = |name: &str| match item.get(name) {
        Some(AttributeValue::S(value)) => value.clone(),
        other => panic!("`{name}` must be a string, got {other:?}"),
    };
    (string("PK"), string("SK"))
}

fn conditional_check_failed() -> Error {
    Error::ConditionalCheckFailedException(
        types::error::ConditionalCheckFailedException::builder()
            .message("The conditional request failed")
            .build(),
    )
}

fn validation_error(message: &str) -> Error {
    Error::from(TransactWriteItemsError::generic(
        aws_sdk_dynamodb::error::ErrorMetadata::builder()
            .code("ValidationException")
            .message(message)
            .build(),
    ))
}

pub fn resource_not_found() -> Error {
    Error::ResourceNotFoundException(
        types::error::ResourceNotFoundException::builder()
            .message("Requested resource not found")
            .build(),
    )
}

struct Placeholders<'a> {
    names: Option<&'a HashMap<String, String>>,
    values: Option<&'a Item>,
}

impl Placeholders<'_> {
    fn name(&self, placeholder: &str) -> String {
        self.names
            .and_then(|names| names.get(placeholder.trim()))
            .unwrap_or_else(|| panic!("unbound name placeholder `{placeholder}`"))
            .clone()
    }

    fn value(&self, placeholder: &str) -> AttributeValue {
        self.values
            .and_then(|values| values.get(placeholder.trim()))
            .unwrap_or_else(|| panic!("unbound value placeholder `{placeholder}`"))
            .clone()
    }
}

/// Drop the grouping parens left on an atom after splitting on `AND`.
fn strip_parens(atom: &str) -> &str {
    let mut atom = atom.trim().trim_start_matches('(');
    while atom.matches(')').count() > atom.matches('(').count() {
        atom = &atom[..atom.len() - 1];
    }
    atom.trim()
}

fn call_argument<'e>(atom: &'e str, function: &str) -> Option<&'e str> {
    atom.strip_prefix(function)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
}

fn evaluate(expression: &str, item: Option<&Item>, placeholders: &Placeholders) -> bool {
    expression
        .split(" AND ")
        .all(|atom| evaluate_atom(strip_parens(atom), item, placeholders))
}

fn evaluate_atom(atom: &str, item: Option<&Item>, placeholders: &Placeholders) -> bool {
    let attribute = |placeholder: &str| {
        let name = placeholders.name(placeholder);
        item.and_then(|item| item.get(&name)).cloned()
    };
    if let Some(argument) = call_argument(atom, "attribute_exists") {
        return attribute(argument).is_some();
    }
    if let Some(argument) = call_argument(atom, "attribute_not_exists") {
        return attribute(argument).is_none();
    }
    if let Some(arguments) = call_argument(atom, "begins_with") {
        let (name, value) = arguments
            .split_once(',')
            .unwrap_or_else(|| panic!("malformed `{atom}`"));
        return match (attribute(name), placeholders.value(value)) {
            (Some(AttributeValue::S(actual)), AttributeValue::S(prefix)) => {
                actual.starts_with(&prefix)
            }
            _ => false,
        };
    }
    if let Some((name, value)) = atom.split_once(" <> ") {
        return attribute(name) != Some(placeholders.value(value));
    }
    if let Some((name, value)) = atom.split_once(" = ") {
        return attribute(name) == Some(placeholders.value(value));
    }
    panic!("unsupported expression `{atom}`")
}

/// Apply an update expression, returning the names it touched.
fn apply_update(expression: &str, item: &mut Item, placeholders: &Placeholders) -> Vec<String> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for token in expression.split_whitespace() {
        match token {
            "SET" | "REMOVE" | "ADD" | "DELETE" => sections.push((token.to_string(), Vec::new())),
            _ => sections
                .last_mut()
                .unwrap_or_else(|| panic!("update expression without action: `{expression}`"))
                .1
                .push(token),
        }
    }
    let mut touched = Vec::new();
    for (keyword, tokens) in sections {
        let body = tokens.join(" ");
        for entry in body.split(',').map(str::trim) {
            match keyword.as_str() {
                "SET" => {
                    let (name, value) = entry
                        .split_once(" = ")
                        .unwrap_or_else(|| panic!("unsupported SET entry `{entry}`"));
                    assert!(value.starts_with(':'), "unsupported SET entry `{entry}`");
                    let name = placeholders.name(name);
                    item.insert(name.clone(), placeholders.value(value));
                    touched.push(name);
                }
                "REMOVE" => {
                    let name = placeholders.name(entry);
                    item.remove(&name);
                    touched.push(name);
                }
                other => panic!("unsupported update action `{other}`"),
            }
        }
    }
    touched
}

fn project(item: &Item, projection: Option<&str>, placeholders: &Placeholders) -> Item {
    match projection {
        Some(projection) => {
            let names: Vec<_> = projection
                .split(',')
                .map(|placeholder| placeholders.name(placeholder))
                .collect();
            item.iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        }
        None => item.clone(),
    }
}

fn returned_image(
    return_values: Option<&types::ReturnValue>,
    old: Option<&Item>,
    new: Option<&Item>,
    touched: &[String],
) -> Option<Item> {
    let only_touched = |item: &Item| -> Item {
        item.iter()
            .filter(|(name, _)| touched.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    };
    match return_values {
        None | Some(types::ReturnValue::None) => None,
        Some(types::ReturnValue::AllOld) => old.cloned(),
        Some(types::ReturnValue::AllNew) => new.cloned(),
        Some(types::ReturnValue::UpdatedOld) => old.map(only_touched),
        Some(types::ReturnValue::UpdatedNew) => new.map(only_touched),
        Some(other) => panic!("unsupported return value {other:?}"),
    }
}

impl MemoryBackend {
    /// Store `item` directly.
    pub fn insert(&self, item: Item) {
        let key = store_key(&item);
        self.store.lock().unwrap().insert(key, item);
    }

    /// The stored item under (`pk`, `sk`).
    pub fn item(&self, pk: &str, sk: &str) -> Option<Item> {
        self.store
            .lock()
            .unwrap()
            .get(&(pk.to_string(), sk.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: Error) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Report the last key of every batch get request as unprocessed.
    pub fn leave_unprocessed(&self) {
        *self.leave_unprocessed.lock().unwrap() = true;
    }

    /// Cancel `token` right after serving the next query page.
    pub fn cancel_after_query_page(&self, token: CancellationToken) {
        *self.cancel_after_query_page.lock().unwrap() = Some(token);
    }

    fn take_failure(&self) -> Result<(), Error> {
        match self.fail_next.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap());
    }

    fn check(
        store: &BTreeMap<StoreKey, Item>,
        key: &StoreKey,
        condition: Option<&str>,
        placeholders: &Placeholders,
    ) -> bool {
        condition.is_none_or(|condition| evaluate(condition, store.get(key), placeholders))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, Error> {
        self.record(|calls| calls.get_item += 1);
        self.take_failure()?;
        let key = store_key(input.key().expect("key"));
        let placeholders = Placeholders {
            names: input.expression_attribute_names(),
            values: None,
        };
        let item = self
            .store
            .lock()
            .unwrap()
            .get(&key)
            .map(|item| project(item, input.projection_expression(), &placeholders));
        Ok(GetItemOutput::builder().set_item(item).build())
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, Error> {
        self.record(|calls| calls.put_item += 1);
        self.take_failure()?;
        let item = input.item().expect("item").clone();
        let key = store_key(&item);
        let placeholders = Placeholders {
            names: input.expression_attribute_names(),
            values: input.expression_attribute_values(),
        };
        let mut store = self.store.lock().unwrap();
        if !Self::check(&store, &key, input.condition_expression(), &placeholders) {
            return Err(conditional_check_failed());
        }
        let old = store.insert(key, item.clone());
        let attributes = returned_image(input.return_values(), old.as_ref(), Some(&item), &[]);
        Ok(PutItemOutput::builder().set_attributes(attributes).build())
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, Error> {
        self.record(|calls| calls.update_item += 1);
        self.take_failure()?;
        let key_item = input.key().expect("key").clone();
        let key = store_key(&key_item);
        let placeholders = Placeholders {
            names: input.expression_attribute_names(),
            values: input.expression_attribute_values(),
        };
        let mut store = self.store.lock().unwrap();
        if !Self::check(&store, &key, input.condition_expression(), &placeholders) {
            return Err(conditional_check_failed());
        }
        let old = store.get(&key).cloned();
        let mut new = old.clone().unwrap_or(key_item);
        let touched = apply_update(
            input.update_expression().expect("update expression"),
            &mut new,
            &placeholders,
        );
        store.insert(key, new.clone());
        let attributes = returned_image(input.return_values(), old.as_ref(), Some(&new), &touched);
        Ok(UpdateItemOutput::builder().set_attributes(attributes).build())
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, Error> {
        self.record(|calls| calls.delete_item += 1);
        self.take_failure()?;
        let key = store_key(input.key().expect("key"));
        let placeholders = Placeholders {
            names: input.expression_attribute_names(),
            values: input.expression_attribute_values(),
        };
        let mut store = self.store.lock().unwrap();
        if !Self::check(&store, &key, input.condition_expression(), &placeholders) {
            return Err(conditional_check_failed());
        }
        let old = store.remove(&key);
        let attributes = returned_image(input.return_values(), old.as_ref(), None, &[]);
        Ok(DeleteItemOutput::builder().set_attributes(attributes).build())
    }

    async fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput, Error> {
        let request = input
            .request_items()
            .and_then(|request_items| request_items.get(TABLE_NAME))
            .expect("request for the test table")
            .clone();
        self.record(|calls| {
            calls.batch_get_item += 1;
            calls.batch_get_sizes.push(request.keys().len());
        });
        self.take_failure()?;
        let placeholders = Placeholders {
            names: request.expression_attribute_names(),
            values: None,
        };
        let mut keys = request.keys().to_vec();
        let mut unprocessed = HashMap::new();
        if *self.leave_unprocessed.lock().unwrap() {
            if let Some(last) = keys.pop() {
                unprocessed.insert(
                    TABLE_NAME.to_string(),
                    types::KeysAndAttributes::builder()
                        .keys(last)
                        .build()
                        .expect("keys"),
                );
            }
        }
        let store = self.store.lock().unwrap();
        let items: Vec<_> = keys
            .iter()
            .filter_map(|key| store.get(&store_key(key)))
            .map(|item| project(item, request.projection_expression(), &placeholders))
            .collect();
        Ok(BatchGetItemOutput::builder()
            .set_responses(Some(HashMap::from([(TABLE_NAME.to_string(), items)])))
            .set_unprocessed_keys(Some(unprocessed))
            .build())
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, Error> {
        self.record(|calls| calls.query += 1);
        self.take_failure()?;
        let placeholders = Placeholders {
            names: input.expression_attribute_names(),
            values: input.expression_attribute_values(),
        };
        let key_condition = input.key_condition_expression().expect("key condition");
        let store = self.store.lock().unwrap();
        let mut matching: Vec<&Item> = store
            .values()
            .filter(|item| evaluate(key_condition, Some(item), &placeholders))
            .collect();
        if input.scan_index_forward() == Some(false) {
            matching.reverse();
        }
        if let Some(start) = input.exclusive_start_key() {
            let start = store_key(start);
            let position = matching
                .iter()
                .position(|item| store_key(item) == start)
                .expect("exclusive start key among matches");
            matching.drain(..=position);
        }
        let limit = input
            .limit()
            .map_or(matching.len(), |limit| usize::try_from(limit).expect("limit"));
        let more = matching.len() > limit;
        matching.truncate(limit);
        let last_evaluated_key = matching
            .last()
            .filter(|_| more)
            .map(|item| Item::from([
                ("PK".to_string(), item["PK"].clone()),
                ("SK".to_string(), item["SK"].clone()),
            ]));
        let filtered: Vec<&Item> = matching
            .into_iter()
            .filter(|item| {
                input
                    .filter_expression()
                    .is_none_or(|filter| evaluate(filter, Some(item), &placeholders))
            })
            .collect();
        let count = i32::try_from(filtered.len()).expect("count");
        let items = match input.select() {
            Some(types::Select::Count) => None,
            _ => Some(
                filtered
                    .into_iter()
                    .map(|item| project(item, input.projection_expression(), &placeholders))
                    .collect(),
            ),
        };
        if let Some(token) = self.cancel_after_query_page.lock().unwrap().take() {
            token.cancel();
        }
        Ok(QueryOutput::builder()
            .set_items(items)
            .count(count)
            .scanned_count(count)
            .set_last_evaluated_key(last_evaluated_key)
            .build())
    }

    async fn transact_write_items(
        &self,
        input: TransactWriteItemsInput,
    ) -> Result<TransactWriteItemsOutput, Error> {
        let members = input.transact_items();
        self.record(|calls| {
            calls.transact_write_items += 1;
            calls.transact_sizes.push(members.len());
        });
        self.take_failure()?;
        let mut store = self.store.lock().unwrap();
        let mut reasons = Vec::with_capacity(members.len());
        let mut targets = HashSet::with_capacity(members.len());
        for member in members {
            let (key, condition, names, values) = if let Some(update) = member.update() {
                (
                    store_key(update.key()),
                    update.condition_expression(),
                    update.expression_attribute_names(),
                    update.expression_attribute_values(),
                )
            } else if let Some(put) = member.put() {
                (
                    store_key(put.item()),
                    put.condition_expression(),
                    put.expression_attribute_names(),
                    put.expression_attribute_values(),
                )
            } else if let Some(delete) = member.delete() {
                (
                    store_key(delete.key()),
                    delete.condition_expression(),
                    delete.expression_attribute_names(),
                    delete.expression_attribute_values(),
                )
            } else if let Some(check) = member.condition_check() {
                (
                    store_key(check.key()),
                    Some(check.condition_expression()),
                    check.expression_attribute_names(),
                    check.expression_attribute_values(),
                )
            } else {
                panic!("empty transact member");
            };
            if !targets.insert(key.clone()) {
                return Err(validation_error(
                    "Transaction request cannot include multiple operations on one item",
                ));
            }
            let placeholders = Placeholders { names, values };
            let code = if Self::check(&store, &key, condition, &placeholders) {
                "None"
            } else {
                "ConditionalCheckFailed"
            };
            reasons.push(types::CancellationReason::builder().code(code).build());
        }
        if reasons.iter().any(|reason| reason.code() != Some("None")) {
            return Err(Error::TransactionCanceledException(
                types::error::TransactionCanceledException::builder()
                    .message("Transaction cancelled")
                    .set_cancellation_reasons(Some(reasons))
                    .build(),
            ));
        }
        for member in members {
            if let Some(update) = member.update() {
                let key = store_key(update.key());
                let placeholders = Placeholders {
                    names: update.expression_attribute_names(),
                    values: update.expression_attribute_values(),
                };
                let mut item = store.get(&key).cloned().unwrap_or_else(|| update.key().clone());
                apply_update(update.update_expression(), &mut item, &placeholders);
                store.insert(key, item);
            } else if let Some(put) = member.put() {
                store.insert(store_key(put.item()), put.item().clone());
            } else if let Some(delete) = member.delete() {
                store.remove(&store_key(delete.key()));
            }
        }
        Ok(TransactWriteItemsOutput::builder().build())
    }
}
