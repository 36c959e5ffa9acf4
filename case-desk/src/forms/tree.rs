//! Path-addressed form state for records with nested repeatable groups
//! (noticees with amount lines, summoned persons with statements and
//! documents, ...).
//!
//! Every entry of a repeatable group carries a generated key and paths
//! address entries by that key, never by position. Removing an entry leaves
//! the paths of its siblings valid.

use super::FormError;
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Field holding an entry's generated key. Never sent to the backend.
pub const ENTRY_KEY_FIELD: &str = "__key";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey(Uuid);

impl EntryKey {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    fn of(entry: &Value) -> Option<Self> {
        entry
            .get(ENTRY_KEY_FIELD)?
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(Self)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Entry(EntryKey),
}

/// Location of a value inside a [`FormTree`], e.g. `noticees[<key>].amounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![Segment::Field(name.into())])
    }

    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.0.push(Segment::Field(name.into()));
        self
    }

    pub fn entry(mut self, key: EntryKey) -> Self {
        self.0.push(Segment::Entry(key));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Entry(key) => write!(f, "[{}]", key)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormTree {
    root: Value,
}

impl Default for FormTree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl FormTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing an existing record; entries of its groups get keys.
    pub fn from_value(mut value: Value) -> Self {
        assign_keys(&mut value);
        Self { root: value }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.segments() {
            node = match segment {
                Segment::Field(name) => node.get(name)?,
                Segment::Entry(key) => node
                    .as_array()?
                    .iter()
                    .find(|entry| EntryKey::of(entry) == Some(*key))?,
            };
        }
        Some(node)
    }

    /// Set the value at `path`, creating missing intermediate fields.
    ///
    /// Replacing a whole entry keeps the entry's key. On error the form is
    /// left exactly as it was.
    pub fn update_at(&mut self, path: &FieldPath, value: Value) -> Result<(), FormError> {
        self.commit(|root| update_node(root, path, value))
    }

    /// Append an entry to the group at `path`, creating the group if absent.
    pub fn push_entry(&mut self, path: &FieldPath, entry: Value) -> Result<EntryKey, FormError> {
        self.commit(|root| push_node(root, path, entry))
    }

    /// Remove one entry, returning it without its generated keys.
    pub fn remove_entry(&mut self, path: &FieldPath, key: EntryKey) -> Result<Value, FormError> {
        let group = resolve_mut(&mut self.root, path.segments(), false)?;
        let entries = group.as_array_mut().ok_or(FormError::NotAGroup)?;
        let index = entries
            .iter()
            .position(|entry| EntryKey::of(entry) == Some(key))
            .ok_or(FormError::UnknownEntry(key))?;

        let mut removed = entries.remove(index);
        strip_keys(&mut removed);
        Ok(removed)
    }

    /// Keys of the group at `path`, in display order.
    pub fn entry_keys(&self, path: &FieldPath) -> Vec<EntryKey> {
        self.get(path)
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(EntryKey::of).collect())
            .unwrap_or_default()
    }

    /// The record as the backend expects it.
    pub fn to_payload(&self) -> Value {
        let mut payload = self.root.clone();
        strip_keys(&mut payload);
        payload
    }

    /// Apply `change` to a copy of the record and keep it only on success.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut Value) -> Result<T, FormError>,
    ) -> Result<T, FormError> {
        let mut draft = self.root.clone();
        let outcome = change(&mut draft)?;
        self.root = draft;
        Ok(outcome)
    }
}

fn update_node(root: &mut Value, path: &FieldPath, mut value: Value) -> Result<(), FormError> {
    assign_keys(&mut value);

    let Some((last, parents)) = path.segments().split_last() else {
        *root = value;
        return Ok(());
    };

    let parent = resolve_mut(root, parents, true)?;
    match last {
        Segment::Field(name) => {
            if parent.is_null() {
                *parent = Value::Object(Map::new());
            }
            let fields = parent
                .as_object_mut()
                .ok_or_else(|| FormError::NotAnObject(path.to_string()))?;
            fields.insert(name.clone(), value);
        }
        Segment::Entry(key) => {
            let slot = find_entry_mut(parent, *key)?;
            let Value::Object(mut fields) = value else {
                return Err(FormError::EntryNotObject);
            };
            fields.insert(ENTRY_KEY_FIELD.to_string(), Value::String(key.to_string()));
            *slot = Value::Object(fields);
        }
    }
    Ok(())
}

fn push_node(root: &mut Value, path: &FieldPath, mut entry: Value) -> Result<EntryKey, FormError> {
    if !entry.is_object() {
        return Err(FormError::EntryNotObject);
    }

    let group = resolve_mut(root, path.segments(), true)?;
    if group.is_null() {
        *group = Value::Array(Vec::new());
    }
    let entries = group.as_array_mut().ok_or(FormError::NotAGroup)?;

    assign_keys(&mut entry);
    let key = EntryKey::generate();
    if let Value::Object(fields) = &mut entry {
        fields.insert(ENTRY_KEY_FIELD.to_string(), Value::String(key.to_string()));
    }
    entries.push(entry);
    Ok(key)
}

fn resolve_mut<'a>(
    node: &'a mut Value,
    segments: &[Segment],
    create: bool,
) -> Result<&'a mut Value, FormError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(node);
    };

    let child = match head {
        Segment::Field(name) => {
            if create && node.is_null() {
                *node = Value::Object(Map::new());
            }
            let fields = node
                .as_object_mut()
                .ok_or_else(|| FormError::NotAnObject(name.clone()))?;
            if create {
                fields.entry(name.clone()).or_insert(Value::Null)
            } else {
                fields
                    .get_mut(name)
                    .ok_or_else(|| FormError::MissingField(name.clone()))?
            }
        }
        Segment::Entry(key) => find_entry_mut(node, *key)?,
    };

    resolve_mut(child, rest, create)
}

fn find_entry_mut(node: &mut Value, key: EntryKey) -> Result<&mut Value, FormError> {
    node.as_array_mut()
        .ok_or(FormError::NotAGroup)?
        .iter_mut()
        .find(|entry| EntryKey::of(entry) == Some(key))
        .ok_or(FormError::UnknownEntry(key))
}

/// Give every object inside an array a key, keeping keys already present.
fn assign_keys(value: &mut Value) {
    match value {
        Value::Array(entries) => {
            for entry in entries.iter_mut() {
                let keyed = EntryKey::of(entry).is_some();
                if let Value::Object(fields) = &mut *entry {
                    if !keyed {
                        fields.insert(
                            ENTRY_KEY_FIELD.to_string(),
                            Value::String(EntryKey::generate().to_string()),
                        );
                    }
                }
                assign_keys(entry);
            }
        }
        Value::Object(fields) => {
            for child in fields.values_mut() {
                assign_keys(child);
            }
        }
        _ => {}
    }
}

fn strip_keys(value: &mut Value) {
    match value {
        Value::Array(entries) => entries.iter_mut().for_each(strip_keys),
        Value::Object(fields) => {
            fields.remove(ENTRY_KEY_FIELD);
            fields.values_mut().for_each(strip_keys);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noticees() -> FieldPath {
        FieldPath::field("noticees")
    }

    #[test]
    fn test_update_creates_intermediate_fields() {
        let mut form = FormTree::new();
        form.update_at(&FieldPath::field("notice").then("number"), json!("SCN-11"))
            .unwrap();

        assert_eq!(form.to_payload(), json!({ "notice": { "number": "SCN-11" } }));
    }

    #[test]
    fn test_removing_an_entry_keeps_sibling_paths_valid() {
        let mut form = FormTree::new();
        let first = form.push_entry(&noticees(), json!({ "name": "A" })).unwrap();
        let second = form.push_entry(&noticees(), json!({ "name": "B" })).unwrap();
        let third = form.push_entry(&noticees(), json!({ "name": "C" })).unwrap();

        let third_name = noticees().entry(third).then("name");
        form.remove_entry(&noticees(), second).unwrap();
        form.update_at(&third_name, json!("C (revised)")).unwrap();

        assert_eq!(form.entry_keys(&noticees()), vec![first, third]);
        assert_eq!(
            form.to_payload(),
            json!({ "noticees": [{ "name": "A" }, { "name": "C (revised)" }] })
        );
    }

    #[test]
    fn test_nested_groups_are_independent() {
        let mut form = FormTree::new();
        let a = form.push_entry(&noticees(), json!({ "name": "A" })).unwrap();
        let b = form.push_entry(&noticees(), json!({ "name": "B" })).unwrap();

        let a_amounts = noticees().entry(a).then("amounts");
        let b_amounts = noticees().entry(b).then("amounts");
        let a1 = form.push_entry(&a_amounts, json!({ "tax": 100 })).unwrap();
        form.push_entry(&a_amounts, json!({ "tax": 200 })).unwrap();
        form.push_entry(&b_amounts, json!({ "tax": 900 })).unwrap();

        form.remove_entry(&a_amounts, a1).unwrap();

        assert_eq!(
            form.to_payload(),
            json!({ "noticees": [
                { "name": "A", "amounts": [{ "tax": 200 }] },
                { "name": "B", "amounts": [{ "tax": 900 }] },
            ]})
        );
    }

    #[test]
    fn test_existing_record_entries_become_addressable() {
        let record = json!({
            "id": 5,
            "persons": [
                { "name": "X", "statements": [{ "place": "Office", "documents": [] }] }
            ]
        });
        let mut form = FormTree::from_value(record.clone());

        let persons = FieldPath::field("persons");
        let person = form.entry_keys(&persons)[0];
        let statements = persons.clone().entry(person).then("statements");
        let statement = form.entry_keys(&statements)[0];
        let documents = statements.entry(statement).then("documents");
        form.push_entry(&documents, json!({ "description": "Invoice copy" }))
            .unwrap();

        let payload = form.to_payload();
        assert_eq!(payload["id"], 5);
        assert_eq!(
            payload["persons"][0]["statements"][0]["documents"],
            json!([{ "description": "Invoice copy" }])
        );
        assert!(!payload.to_string().contains(ENTRY_KEY_FIELD));
    }

    #[test]
    fn test_replacing_an_entry_keeps_its_key() {
        let mut form = FormTree::new();
        let key = form.push_entry(&noticees(), json!({ "name": "A" })).unwrap();

        form.update_at(&noticees().entry(key), json!({ "name": "Z", "gstin": "" }))
            .unwrap();

        assert_eq!(form.entry_keys(&noticees()), vec![key]);
        assert_eq!(
            form.get(&noticees().entry(key).then("name")),
            Some(&json!("Z"))
        );
    }

    #[test]
    fn test_errors() {
        let mut form = FormTree::from_value(json!({ "title": "x", "noticees": [] }));

        assert!(matches!(
            form.push_entry(&FieldPath::field("title"), json!({})),
            Err(FormError::NotAGroup)
        ));
        assert!(matches!(
            form.push_entry(&noticees(), json!("not an object")),
            Err(FormError::EntryNotObject)
        ));
        assert!(matches!(
            form.remove_entry(&FieldPath::field("missing"), EntryKey::generate()),
            Err(FormError::MissingField(_))
        ));

        let stray = EntryKey::generate();
        assert!(matches!(
            form.remove_entry(&noticees(), stray),
            Err(FormError::UnknownEntry(k)) if k == stray
        ));
        assert!(form.get(&noticees().entry(stray)).is_none());
    }

    #[test]
    fn test_failed_change_leaves_form_untouched() {
        let mut form = FormTree::from_value(json!({ "number": "SCN-1" }));
        let before = form.clone();
        let stray = EntryKey::generate();

        assert!(matches!(
            form.update_at(&noticees().entry(stray).then("name"), json!("X")),
            Err(FormError::NotAGroup)
        ));
        assert!(matches!(
            form.push_entry(&noticees().entry(stray).then("amounts"), json!({})),
            Err(FormError::NotAGroup)
        ));
        assert!(matches!(
            form.update_at(&FieldPath::field("number").then("suffix"), json!("A")),
            Err(FormError::NotAnObject(_))
        ));

        assert_eq!(form, before);
        assert_eq!(form.to_payload(), json!({ "number": "SCN-1" }));
    }

    #[test]
    fn test_path_display() {
        let key = EntryKey::generate();
        let path = FieldPath::field("noticees").entry(key).then("amounts");
        assert_eq!(path.to_string(), format!("noticees[{}].amounts", key));
    }
}
