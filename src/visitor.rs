use crate::ast::{Attribute, Element, EmbeddedExpression, Fragment, Text};

/// The TemplateVisitor trait defines the single traversal mechanism for the fragment tree.
///
/// Rules:
/// 1. Traversal is pre-order: an element, then its attributes, then its children.
/// 2. Implementers override `visit_*` methods to add behavior.
/// 3. Implementers MUST call `walk_*` functions to continue traversal unless pruning is intended.
pub trait TemplateVisitor<'a> {
    fn visit_fragments(&mut self, fragments: &[Fragment<'a>]) {
        walk_fragments(self, fragments);
    }

    fn visit_fragment(&mut self, fragment: &Fragment<'a>) {
        walk_fragment(self, fragment);
    }

    fn visit_element(&mut self, element: &Element<'a>) {
        walk_element(self, element);
    }

    fn visit_attribute(&mut self, _attribute: &Attribute<'a>) {
        // Leaf node
    }

    fn visit_text(&mut self, _text: &Text) {
        // Leaf node
    }

    fn visit_expression(&mut self, _expression: &EmbeddedExpression<'a>) {
        // Leaf node
    }
}

pub fn walk_fragments<'a, V: TemplateVisitor<'a> + ?Sized>(
    visitor: &mut V,
    fragments: &[Fragment<'a>],
) {
    for fragment in fragments {
        visitor.visit_fragment(fragment);
    }
}

pub fn walk_fragment<'a, V: TemplateVisitor<'a> + ?Sized>(
    visitor: &mut V,
    fragment: &Fragment<'a>,
) {
    match fragment {
        Fragment::Element(element) => visitor.visit_element(element),
        Fragment::Text(text) => visitor.visit_text(text),
        Fragment::Expression(expression) => visitor.visit_expression(expression),
    }
}

pub fn walk_element<'a, V: TemplateVisitor<'a> + ?Sized>(visitor: &mut V, element: &Element<'a>) {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute);
    }
    visitor.visit_fragments(&element.children);
}
