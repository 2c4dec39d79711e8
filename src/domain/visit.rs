//! Tree traversal scaffolding.
//!
//! `Visit` walks a tree read-only, threading a caller-defined scope value down
//! the recursion so nested definitions never leak context into their siblings.
//! `VisitMut` walks it mutably for rewrites. Both dispatch through one
//! exhaustive match and default to plain structural recursion.

use crate::domain::ast::{AstNode, AstNodeKind};
use crate::error::Result;

pub trait Visit<'ast> {
    /// Context handed from a node to its children.
    type Scope: Copy;

    fn visit_node(&mut self, node: &'ast AstNode, scope: Self::Scope) {
        match &node.kind {
            AstNodeKind::ClassDef { name } => self.visit_class_def(node, name, scope),
            AstNodeKind::FunctionDef { name } => self.visit_function_def(node, name, scope),
            AstNodeKind::Assert => self.visit_assert(node, scope),
            AstNodeKind::Call => self.visit_call(node, scope),
            AstNodeKind::Module
            | AstNodeKind::Block
            | AstNodeKind::Attribute { .. }
            | AstNodeKind::Name { .. }
            | AstNodeKind::Compare { .. }
            | AstNodeKind::Subscript
            | AstNodeKind::Diagnostic { .. }
            | AstNodeKind::Other(_) => walk(self, node, scope),
        }
    }

    fn visit_class_def(&mut self, node: &'ast AstNode, _name: &'ast str, scope: Self::Scope) {
        walk(self, node, scope)
    }

    fn visit_function_def(&mut self, node: &'ast AstNode, _name: &'ast str, scope: Self::Scope) {
        walk(self, node, scope)
    }

    fn visit_assert(&mut self, node: &'ast AstNode, scope: Self::Scope) {
        walk(self, node, scope)
    }

    fn visit_call(&mut self, node: &'ast AstNode, scope: Self::Scope) {
        walk(self, node, scope)
    }
}

/// Visit every child of `node` with the same scope.
pub fn walk<'ast, V>(visitor: &mut V, node: &'ast AstNode, scope: V::Scope)
where
    V: Visit<'ast> + ?Sized,
{
    for child in &node.children {
        visitor.visit_node(child, scope);
    }
}

pub trait VisitMut {
    fn visit_node_mut(&mut self, node: &mut AstNode) -> Result<()> {
        match node.kind {
            AstNodeKind::FunctionDef { .. } => self.visit_function_def_mut(node),
            AstNodeKind::Block => self.visit_block_mut(node),
            AstNodeKind::Module
            | AstNodeKind::ClassDef { .. }
            | AstNodeKind::Assert
            | AstNodeKind::Call
            | AstNodeKind::Attribute { .. }
            | AstNodeKind::Name { .. }
            | AstNodeKind::Compare { .. }
            | AstNodeKind::Subscript
            | AstNodeKind::Diagnostic { .. }
            | AstNodeKind::Other(_) => walk_mut(self, node),
        }
    }

    fn visit_function_def_mut(&mut self, node: &mut AstNode) -> Result<()> {
        walk_mut(self, node)
    }

    fn visit_block_mut(&mut self, node: &mut AstNode) -> Result<()> {
        walk_mut(self, node)
    }
}

pub fn walk_mut<V>(visitor: &mut V, node: &mut AstNode) -> Result<()>
where
    V: VisitMut + ?Sized,
{
    for child in node.children.iter_mut() {
        visitor.visit_node_mut(child)?;
    }
    Ok(())
}
