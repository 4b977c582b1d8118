// Block-text parser: tokens in, `Mission` items out.
//
// Grammar: `Tag { (Name = value;)* (ChildTag { ... })* }`, any number of
// top-level blocks. The parser keeps an explicit stack of open blocks:
// - Open: create the item (detached) and push it. A `Damaged` block
//   directly inside an item is not an item; it pushes a marker frame and
//   its `component = amount;` properties are folded into the owner's damage
//   profile.
// - Property: set it on the item on top of the stack.
// - Close: pop.
//
// Nothing is attached to the tree until the whole source has parsed. Every
// block's place (root, or child of its enclosing block) is recorded and
// applied in one pass at the end, so a failed parse leaves the mission's
// roots and existing items untouched; the items it created stay detached
// and are never walked.
//
// Cross-references written in the source (`Index`, an object's `LinkTrId`,
// an entity's `MisObjID`) use the source file's numbering, which means
// nothing to this run. They are not stored as properties; instead each
// `MCU_TR_Entity` is linked to the object they name with
// `Mission::adopt_entity`, and the run assigns fresh indices. A reference
// that names no parsed block is dropped with a warning.
//
// Values: a quoted value is a string with the quotes stripped (`\"` is the
// only escape). An unquoted value that is a numeric literal is a number;
// any other bare text is a string. A bare number as `Name`/`Desc` is a
// localized id on icons and plain text everywhere else. List values
// (`[...]`) and colon records (`a : b : c`) are rejected.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use sortie_mission::{ConstructionError, ItemId, ItemKind, Mission, PropKey, StructuralError, Value};
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::lexer::{Lexer, TokenKind};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").expect("valid number rule")
});

static RECORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s:|:\s").expect("valid record rule"));

/// Block tag that folds into the enclosing item's damage profile.
const DAMAGED_TAG: &str = "Damaged";

/// Source-numbering property naming the block itself.
const INDEX_PROP: &str = "Index";

enum Frame {
    Item { id: ItemId, line: usize },
    Damaged { owner: ItemId, line: usize },
}

/// Where a parsed block goes once the whole source is accepted.
struct Placement {
    id: ItemId,
    parent: Option<ItemId>,
    line: usize,
}

/// Source-numbered references collected during one parse.
#[derive(Default)]
struct SourceRefs {
    /// `Index` -> the block that declared it.
    by_index: BTreeMap<u32, ItemId>,
    /// Entity -> (owner's source index, line), from `MisObjID`.
    owners: BTreeMap<ItemId, (u32, usize)>,
    /// Object -> (entity's source index, line), from `LinkTrId`.
    entities: BTreeMap<ItemId, (u32, usize)>,
}

pub struct Parser<'m> {
    mission: &'m mut Mission,
}

fn construction(line: usize, source: impl Into<sortie_mission::Error>) -> ParseError {
    ParseError::Construction {
        line,
        source: source.into(),
    }
}

/// Interpret a raw value as written in the source.
fn parse_value(name: &str, raw: &str, line: usize) -> Result<Value, ParseError> {
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(Value::Str(inner.replace("\\\"", "\"")));
    }
    if raw.starts_with('[') || RECORD.is_match(raw) {
        return Err(ParseError::ComplexValue {
            line,
            name: name.to_owned(),
        });
    }
    if NUMBER.is_match(raw) {
        if let Ok(n) = raw.parse::<f64>() {
            return Ok(Value::Num(n));
        }
    }
    Ok(Value::Str(raw.to_owned()))
}

/// A source-numbered reference: a whole number in `u32` range.
fn source_ref(name: &str, value: &Value, line: usize) -> Result<u32, ParseError> {
    match value.as_num() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => Ok(n as u32),
        _ => Err(construction(line, ConstructionError::InvalidValue {
            key: name.to_owned(),
            expected: "a whole non-negative number",
            found: value.shape(),
        })),
    }
}

impl<'m> Parser<'m> {
    pub fn new(mission: &'m mut Mission) -> Self {
        Self { mission }
    }

    /// Parse `src`, adding its top-level blocks to the mission as roots.
    /// Returns the new roots in source order. On error the mission's tree
    /// is left as it was.
    pub fn parse_into(&mut self, src: &str) -> Result<Vec<ItemId>, ParseError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut placements: Vec<Placement> = Vec::new();
        let mut refs = SourceRefs::default();
        let mut tokens = 0usize;
        let items_before = self.mission.len();

        for token in Lexer::new(src) {
            let token = token?;
            tokens += 1;
            let line = token.line;
            match token.kind {
                TokenKind::Open(tag) => {
                    let frame = self.open(stack.last(), tag, line)?;
                    if let Frame::Item { id, .. } = &frame {
                        let parent = match stack.last() {
                            Some(&Frame::Item { id: parent, .. }) => Some(parent),
                            _ => None,
                        };
                        placements.push(Placement {
                            id: *id,
                            parent,
                            line,
                        });
                    }
                    stack.push(frame);
                }
                TokenKind::Property { name, raw } => match stack.last() {
                    None => {
                        return Err(ParseError::PropertyOutsideBlock {
                            line,
                            name: name.to_owned(),
                        });
                    }
                    Some(&Frame::Item { id, .. }) => {
                        let value = parse_value(name, raw, line)?;
                        self.property(id, name, raw, value, line, &mut refs)?;
                    }
                    Some(&Frame::Damaged { owner, .. }) => {
                        let value = parse_value(name, raw, line)?;
                        self.damage(owner, name, value, line)?;
                    }
                },
                TokenKind::Close => {
                    if stack.pop().is_none() {
                        return Err(ParseError::UnbalancedClose { line });
                    }
                }
            }
        }

        if let Some(frame) = stack.last() {
            let (tag, line) = match *frame {
                Frame::Item { id, line } => (self.mission[id].kind().tag().to_owned(), line),
                Frame::Damaged { line, .. } => (DAMAGED_TAG.to_owned(), line),
            };
            return Err(ParseError::Unterminated { tag, line });
        }
        if tokens == 0 {
            return Err(ParseError::Empty);
        }

        let adopted = self.link_entities(&refs)?;
        let mut roots = Vec::new();
        for Placement { id, parent, line } in placements {
            if adopted.contains_key(&id) {
                continue;
            }
            let attached = match parent {
                Some(parent) => self.mission.attach_child(parent, id),
                None => {
                    roots.push(id);
                    self.mission.attach_root(id)
                }
            };
            attached.map_err(|e| construction(line, e))?;
        }

        debug!(
            roots = roots.len(),
            items = self.mission.len() - items_before,
            entities = adopted.len(),
            "parsed block text"
        );
        Ok(roots)
    }

    /// Set one property on a parsed item. Source-numbered references are
    /// collected into `refs` instead of the property bag.
    fn property(
        &mut self,
        id: ItemId,
        name: &str,
        raw: &str,
        value: Value,
        line: usize,
        refs: &mut SourceRefs,
    ) -> Result<(), ParseError> {
        if name == INDEX_PROP {
            let index = source_ref(name, &value, line)?;
            if refs.by_index.insert(index, id).is_some_and(|prev| prev != id) {
                return Err(ParseError::DuplicateIndex { line, index });
            }
            return Ok(());
        }
        let key = PropKey::from_name(name);
        let value = match (&key, value) {
            (PropKey::MisObjId, value) => {
                let index = source_ref(name, &value, line)?;
                refs.owners.insert(id, (index, line));
                return Ok(());
            }
            (PropKey::LinkTrId, value) => {
                let index = source_ref(name, &value, line)?;
                refs.entities.insert(id, (index, line));
                return Ok(());
            }
            (PropKey::Name | PropKey::Desc, Value::Num(_))
                if self.mission[id].kind() != &ItemKind::Icon =>
            {
                Value::Str(raw.to_owned())
            }
            (_, value) => value,
        };
        self.mission[id]
            .set(key, value)
            .map_err(|e| construction(line, e))
    }

    /// Pair parsed entities with the objects their references name, check
    /// every pair, then link them. Returns entity -> owner.
    fn link_entities(&mut self, refs: &SourceRefs) -> Result<BTreeMap<ItemId, ItemId>, ParseError> {
        // Owner -> (entity, line), in source order of the owners.
        let mut pairs: BTreeMap<ItemId, (ItemId, usize)> = BTreeMap::new();
        let mut claimed: BTreeMap<ItemId, ItemId> = BTreeMap::new();

        for (&entity, &(index, line)) in &refs.owners {
            if self.mission[entity].kind() != &ItemKind::Entity || index == 0 {
                continue;
            }
            let Some(&owner) = refs.by_index.get(&index) else {
                warn!(line, index, "MisObjID names no parsed block; entity left unlinked");
                continue;
            };
            if pairs.insert(owner, (entity, line)).is_some() {
                return Err(construction(
                    line,
                    StructuralError::EntityAlreadyLinked { item: owner },
                ));
            }
            claimed.insert(entity, owner);
        }

        for (&owner, &(index, line)) in &refs.entities {
            if index == 0 {
                continue;
            }
            let Some(&entity) = refs.by_index.get(&index) else {
                warn!(line, index, "LinkTrId names no parsed block; link dropped");
                continue;
            };
            match (pairs.get(&owner), claimed.get(&entity)) {
                (Some(&(linked, _)), _) if linked == entity => {}
                (None, None) if self.mission[entity].kind() == &ItemKind::Entity => {
                    pairs.insert(owner, (entity, line));
                    claimed.insert(entity, owner);
                }
                _ => warn!(line, index, "LinkTrId disagrees with the entity's MisObjID; link dropped"),
            }
        }

        for (&owner, &(_, line)) in &pairs {
            let item = &self.mission[owner];
            if !item.kind().is_object() {
                return Err(construction(line, ConstructionError::RecordsUnsupported {
                    kind: item.kind().tag().to_owned(),
                    what: "linked entities",
                }));
            }
        }
        if let Some(&(_, line)) = pairs.values().next() {
            self.mission
                .ensure_indices(pairs.len() * 2)
                .map_err(|e| construction(line, e))?;
        }

        for (&owner, &(entity, line)) in &pairs {
            self.mission
                .adopt_entity(owner, entity)
                .map_err(|e| construction(line, e))?;
        }
        Ok(claimed)
    }

    fn open(&mut self, parent: Option<&Frame>, tag: &str, line: usize) -> Result<Frame, ParseError> {
        match parent {
            Some(&Frame::Damaged { .. }) => Err(ParseError::NestedInDamaged {
                line,
                tag: tag.to_owned(),
            }),
            Some(&Frame::Item { id: owner, .. }) if tag == DAMAGED_TAG => {
                Ok(Frame::Damaged { owner, line })
            }
            _ => {
                let id = self
                    .mission
                    .create_tagged(tag)
                    .map_err(|e| construction(line, e))?;
                Ok(Frame::Item { id, line })
            }
        }
    }

    fn damage(&mut self, owner: ItemId, name: &str, value: Value, line: usize) -> Result<(), ParseError> {
        let component = name.parse::<u32>().map_err(|_| {
            construction(line, ConstructionError::InvalidValue {
                key: name.to_owned(),
                expected: "a numeric damage component",
                found: "name",
            })
        })?;
        let amount = value.as_num().ok_or_else(|| {
            construction(line, ConstructionError::InvalidValue {
                key: name.to_owned(),
                expected: "a damage amount",
                found: value.shape(),
            })
        })?;
        self.mission[owner]
            .set_damage(component, amount)
            .map_err(|e| construction(line, e))
    }
}
