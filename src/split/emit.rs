//! Emitting packages back into container bytes.

use crate::backend::{self, ElementTree, EncodeError, Payload};
use crate::common::FormatError;
use crate::package::constants::CONTENT_TYPES_MEMBER;
use crate::package::{PackURI, Package, Part};
use std::sync::Arc;

/// Member tree of a package in canonical order.
///
/// The content type map and package relationships come first, then the main
/// part and its relationships, then every other part by name, each followed
/// by its relationship part. The same package always yields the same tree.
pub fn to_tree(package: &Package) -> ElementTree {
    let mut tree = ElementTree::new();
    tree.push(
        CONTENT_TYPES_MEMBER,
        Payload::Xml(Arc::new(package.content_types().to_xml())),
    );
    let root = PackURI::package();
    if let Some(rels) = package.relationships_of(&root) {
        tree.push(root.rels_uri().membername(), Payload::Xml(Arc::new(rels.to_xml())));
    }

    let main = package.main_part();
    tree.push(main.name().membername(), main.payload().clone());
    if let Some(rels) = package.relationships_of(main.name()) {
        tree.push(
            main.name().rels_uri().membername(),
            Payload::Xml(Arc::new(rels.to_xml())),
        );
    }

    let mut rest: Vec<&Part> = package
        .parts()
        .iter()
        .filter(|part| part.name() != main.name())
        .collect();
    rest.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
    for part in rest {
        tree.push(part.name().membername(), part.payload().clone());
        if let Some(rels) = package.relationships_of(part.name())
            && !rels.is_empty()
        {
            tree.push(
                part.name().rels_uri().membername(),
                Payload::Xml(Arc::new(rels.to_xml())),
            );
        }
    }
    tree
}

/// Serialize a package with the backend it was loaded from.
pub fn emit(package: &Package) -> Result<Vec<u8>, FormatError> {
    let kind = package.backend_kind();
    let backend = backend::for_kind(kind)
        .ok_or_else(|| EncodeError::Layout(format!("no {kind} backend in this build")))?;
    let tree = to_tree(package);
    let bytes = backend.encode(&tree)?;
    tracing::trace!(backend = %kind, members = tree.len(), bytes = bytes.len(), "package emitted");
    Ok(bytes)
}
