use std::collections::hash_map::Entry::*;
use std::collections::HashMap;

use crate::error::FmtStr;
use crate::lex::Span;
use crate::parse::Key;
use crate::value::{Table, Value};
use crate::Error;


/// A node of the tree while the document is still being decoded. Unlike the
/// public [`Value`] it remembers how each table and array came into
/// existence, which is what the redefinition rules are expressed in terms
/// of.
#[derive(Debug)]
pub(crate) enum Node {
    Table(TableNode),
    Array(ArrayNode),
    Val(Value),
}

#[derive(Debug)]
pub(crate) struct TableNode {
    entries: HashMap<String, TableEntry>,
    origin: TableOrigin,
}

#[derive(Debug)]
struct TableEntry {
    node: Node,
    /// first definition site of the key
    span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TableOrigin {
    Root,
    /// Defined by its own `[header]`, at most once per document.
    Header,
    /// Created on the way to a descendant's header, may still be defined
    /// explicitly later.
    HeaderImplicit,
    /// Created by an intermediate segment of a dotted key.
    Dotted,
    /// `{ ... }` syntax, sealed against any later extension.
    Inline,
}

#[derive(Debug)]
pub(crate) enum ArrayNode {
    /// Repeated `[[header]]` entries, always non-empty, extensible.
    Headers(Vec<TableNode>),
    /// `[ ... ]` syntax, sealed against any later extension.
    Inline(Vec<Value>),
}

impl TableNode {
    pub(crate) fn new(origin: TableOrigin) -> Self {
        Self {
            entries: HashMap::new(),
            origin,
        }
    }

    pub(crate) fn into_table(self) -> Table {
        self.entries
            .into_iter()
            .map(|(k, e)| (k, e.node.into_value()))
            .collect()
    }
}

impl Node {
    pub(crate) fn into_value(self) -> Value {
        match self {
            Node::Table(t) => Value::Table(t.into_table()),
            Node::Array(ArrayNode::Headers(entries)) => Value::Array(
                entries
                    .into_iter()
                    .map(|t| Value::Table(t.into_table()))
                    .collect(),
            ),
            Node::Array(ArrayNode::Inline(values)) => Value::Array(values),
            Node::Val(val) => val,
        }
    }
}

/// Installs `key = <node>` under `table`, walking/creating intermediate
/// tables for all but the last segment of a dotted key.
pub(crate) fn insert_entry(
    table: &mut TableNode,
    prefix: &[String],
    key: &Key<'_>,
    node: Node,
) -> Result<(), Error> {
    let idents = key.idents.as_slice();
    let mut current = table;
    for i in 0..idents.len() - 1 {
        current = descend(current, prefix, key, i, TableOrigin::Dotted)?;
    }

    let last_idx = idents.len() - 1;
    let last = &idents[last_idx];
    match current.entries.entry(last.text.to_string()) {
        Occupied(occupied) => Err(Error::DuplicateKey {
            path: join_path(prefix, key, last_idx),
            orig: occupied.get().span,
            new: last.span,
        }),
        Vacant(vacant) => {
            vacant.insert(TableEntry {
                node,
                span: last.span,
            });
            Ok(())
        }
    }
}

/// Installs a `[a.b.c]` header: the named table is created or, when it only
/// exists implicitly so far, promoted to an explicitly defined one.
pub(crate) fn open_table(root: &mut TableNode, key: &Key<'_>) -> Result<(), Error> {
    let idents = key.idents.as_slice();
    let mut current = root;
    for i in 0..idents.len() - 1 {
        current = descend(current, &[], key, i, TableOrigin::HeaderImplicit)?;
    }

    let last_idx = idents.len() - 1;
    let last = &idents[last_idx];
    match current.entries.entry(last.text.to_string()) {
        Occupied(occupied) => {
            let entry = occupied.into_mut();
            let orig = entry.span;
            match &mut entry.node {
                Node::Table(t) => match t.origin {
                    TableOrigin::Header => Err(Error::DuplicateTable {
                        path: join_path(&[], key, last_idx),
                        orig,
                        new: last.span,
                    }),
                    TableOrigin::Inline => Err(Error::ExtendInlineTable {
                        path: join_path(&[], key, last_idx),
                        orig,
                        new: last.span,
                    }),
                    TableOrigin::Root
                    | TableOrigin::HeaderImplicit
                    | TableOrigin::Dotted => {
                        t.origin = TableOrigin::Header;
                        Ok(())
                    }
                },
                Node::Array(_) | Node::Val(_) => Err(Error::TypeConflict {
                    path: join_path(&[], key, last_idx),
                    existing: entry.node.datatype(),
                    orig,
                    new: last.span,
                }),
            }
        }
        Vacant(vacant) => {
            vacant.insert(TableEntry {
                node: Node::Table(TableNode::new(TableOrigin::Header)),
                span: last.span,
            });
            Ok(())
        }
    }
}

/// Installs a `[[a.b.c]]` header: appends a fresh table to the array of
/// tables at that path, creating the array on first use.
pub(crate) fn open_array_entry(root: &mut TableNode, key: &Key<'_>) -> Result<(), Error> {
    let idents = key.idents.as_slice();
    let mut current = root;
    for i in 0..idents.len() - 1 {
        current = descend(current, &[], key, i, TableOrigin::HeaderImplicit)?;
    }

    let last_idx = idents.len() - 1;
    let last = &idents[last_idx];
    match current.entries.entry(last.text.to_string()) {
        Occupied(occupied) => {
            let entry = occupied.into_mut();
            let orig = entry.span;
            match &mut entry.node {
                Node::Array(ArrayNode::Headers(entries)) => {
                    entries.push(TableNode::new(TableOrigin::Header));
                    Ok(())
                }
                Node::Array(ArrayNode::Inline(_)) | Node::Table(_) | Node::Val(_) => {
                    Err(Error::TypeConflict {
                        path: join_path(&[], key, last_idx),
                        existing: entry.node.datatype(),
                        orig,
                        new: last.span,
                    })
                }
            }
        }
        Vacant(vacant) => {
            vacant.insert(TableEntry {
                node: Node::Array(ArrayNode::Headers(vec![TableNode::new(
                    TableOrigin::Header,
                )])),
                span: last.span,
            });
            Ok(())
        }
    }
}

/// Resolves the table the current header points at. The path has been
/// validated when the header was installed, so the walk itself cannot fail.
pub(crate) fn current_table<'t>(root: &'t mut TableNode, path: &[String]) -> &'t mut TableNode {
    let mut current = root;
    for seg in path {
        let entry = match current.entries.get_mut(seg) {
            Some(e) => e,
            None => unreachable!("the current header path is always installed"),
        };
        current = match &mut entry.node {
            Node::Table(t) => t,
            Node::Array(ArrayNode::Headers(entries)) => match entries.last_mut() {
                Some(t) => t,
                None => unreachable!("arrays of tables are never empty"),
            },
            Node::Array(ArrayNode::Inline(_)) | Node::Val(_) => {
                unreachable!("the current header path only contains tables")
            }
        };
    }
    current
}

/// Walks into the table named by segment `i` of `key`, creating it with the
/// given origin if it doesn't exist yet.
///
/// Any reference to an array of tables points at its most recently defined
/// element, so sub-tables keep attaching to the latest `[[header]]`.
fn descend<'t>(
    current: &'t mut TableNode,
    prefix: &[String],
    key: &Key<'_>,
    i: usize,
    origin: TableOrigin,
) -> Result<&'t mut TableNode, Error> {
    let ident = &key.idents[i];
    let entry = match current.entries.entry(ident.text.to_string()) {
        Occupied(occupied) => occupied.into_mut(),
        Vacant(vacant) => {
            let entry = vacant.insert(TableEntry {
                node: Node::Table(TableNode::new(origin)),
                span: ident.span,
            });
            match &mut entry.node {
                Node::Table(t) => return Ok(t),
                _ => unreachable!(),
            }
        }
    };

    let orig = entry.span;
    match &mut entry.node {
        Node::Table(t) => {
            if t.origin == TableOrigin::Inline {
                return Err(Error::ExtendInlineTable {
                    path: join_path(prefix, key, i),
                    orig,
                    new: ident.span,
                });
            }
            Ok(t)
        }
        Node::Array(ArrayNode::Headers(entries)) => match entries.last_mut() {
            Some(t) => Ok(t),
            None => unreachable!("arrays of tables are never empty"),
        },
        Node::Array(ArrayNode::Inline(_)) => Err(Error::ExtendStaticArray {
            path: join_path(prefix, key, i),
            orig,
            new: ident.span,
        }),
        Node::Val(v) => Err(Error::TypeConflict {
            path: join_path(prefix, key, i),
            existing: v.datatype(),
            orig,
            new: ident.span,
        }),
    }
}

impl Node {
    fn datatype(&self) -> crate::value::Datatype {
        match self {
            Node::Table(_) => crate::value::Datatype::Table,
            Node::Array(_) => crate::value::Datatype::Array,
            Node::Val(v) => v.datatype(),
        }
    }
}

/// The dotted path up to and including segment `upto`, for error messages.
fn join_path(prefix: &[String], key: &Key<'_>, upto: usize) -> FmtStr {
    let mut path = String::new();
    for seg in prefix {
        path.push_str(seg);
        path.push('.');
    }
    for ident in &key.idents[..=upto] {
        path.push_str(ident.text);
        path.push('.');
    }
    path.pop();
    FmtStr::from_string(path)
}
