//! Child reconciliation.
//!
//! One forward pass per tree level: the new child elements are walked in
//! lockstep with the previous generation's fibers at the same level, matched
//! purely by position. A positional pair of the same type becomes an update
//! that reuses the old fiber's node; any other pair replaces, which tags the
//! old fiber for deletion and plans a fresh addition. There is no key-based
//! matching, so reordering same-typed children updates them in place and
//! reordering differently-typed children rebuilds them.

use crate::element::{Element, ElementKind, NODE_VALUE};
use crate::fiber::{Effect, Fiber, FiberId};
use crate::host::HostAdapter;
use crate::runtime::Runtime;
use crate::RenderError;

impl<H: HostAdapter> Runtime<H> {
    /// Diff `elements` against the old children of `parent`'s alternate and
    /// link the produced fibers as `parent`'s new children.
    pub(crate) fn reconcile_children(
        &mut self,
        parent: FiberId,
        elements: Vec<Element>,
    ) -> Result<(), RenderError> {
        let mut old = self.fibers[parent]
            .alternate
            .and_then(|alt| self.fibers.get(alt))
            .and_then(|alt| alt.child);
        let total = elements.len();
        let mut elements = elements.into_iter();
        let mut index = 0usize;
        let mut previous: Option<FiberId> = None;
        let (mut added, mut updated, mut deleted) = (0usize, 0usize, 0usize);

        while index < total || old.is_some() {
            let element = elements.next();
            if let Some(el) = &element {
                validate_element(el)?;
            }
            let next_old = old.and_then(|id| self.fibers[id].sibling);

            let produced = match (old, element) {
                // Same type at the same position: update in place.
                (Some(old_id), Some(el)) if self.fibers[old_id].kind.matches(el.kind()) => {
                    updated += 1;
                    let (_, props) = el.into_parts();
                    let (kind, node) = {
                        let prior = &self.fibers[old_id];
                        (prior.kind.clone(), prior.node)
                    };
                    Some(
                        self.fibers
                            .insert(Fiber::updating(kind, props, parent, old_id, node)),
                    )
                }
                // New element with no usable counterpart: add, and throw the
                // mismatched old fiber away if there was one.
                (old_slot, Some(el)) => {
                    if let Some(old_id) = old_slot {
                        deleted += 1;
                        self.delete_fiber(old_id);
                    }
                    added += 1;
                    let (kind, props) = el.into_parts();
                    Some(self.fibers.insert(Fiber::added(kind, props, parent)))
                }
                // Trailing old fiber with no new element: delete.
                (Some(old_id), None) => {
                    deleted += 1;
                    self.delete_fiber(old_id);
                    None
                }
                (None, None) => None,
            };

            // Only produced fibers enter the sibling chain; deletions leave
            // no hole behind.
            if let Some(new_id) = produced {
                match previous {
                    None => self.fibers[parent].child = Some(new_id),
                    Some(prior) => self.fibers[prior].sibling = Some(new_id),
                }
                previous = Some(new_id);
            }

            index += 1;
            old = next_old;
        }

        log::trace!(
            "reconciled level under {parent:?}: {added} added, {updated} updated, {deleted} deleted"
        );
        Ok(())
    }

    fn delete_fiber(&mut self, id: FiberId) {
        self.fibers[id].effect = Effect::Delete;
        self.deletions.push(id);
        log::trace!("fiber {id:?} tagged for deletion");
    }
}

fn validate_element(element: &Element) -> Result<(), RenderError> {
    match element.kind() {
        ElementKind::Host(tag) if tag.is_empty() => Err(RenderError::InvalidElement {
            detail: String::from("host element with an empty tag"),
        }),
        ElementKind::Text if element.props().get(NODE_VALUE).is_none() => {
            Err(RenderError::InvalidElement {
                detail: String::from("text element without a nodeValue prop"),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Props;
    use crate::memory::HostOp;
    use crate::testing::RenderTest;

    fn row(names: &[&str]) -> Element {
        let items: Vec<Element> = names
            .iter()
            .map(|name| {
                Element::host("p", Props::new().attr("name", *name), Vec::<Element>::new())
            })
            .collect();
        Element::host("div", Props::new(), items)
    }

    #[test]
    fn removing_a_tail_child_is_exactly_one_removal() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(row(&["a", "b", "c"]));
        let div = rt.only_child(rt.container());
        let last = rt.children(div)[2];
        rt.take_ops();

        rt.render_to_idle(row(&["a", "b"]));
        assert_eq!(
            rt.take_ops(),
            vec![HostOp::RemoveChild {
                parent: div,
                child: last
            }]
        );
        assert_eq!(rt.children(div).len(), 2);
    }

    #[test]
    fn growing_a_level_only_adds_the_tail() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(row(&["a", "b"]));
        let div = rt.only_child(rt.container());
        rt.take_ops();

        rt.render_to_idle(row(&["a", "b", "c", "d"]));
        let ops = rt.take_ops();
        let creates = ops
            .iter()
            .filter(|op| matches!(op, HostOp::Create { .. }))
            .count();
        let appends = ops
            .iter()
            .filter(|op| matches!(op, HostOp::AppendChild { .. }))
            .count();
        assert_eq!(creates, 2);
        assert_eq!(appends, 2);
        assert!(!ops
            .iter()
            .any(|op| matches!(op, HostOp::RemoveChild { .. } | HostOp::RemoveProperty { .. })));
        assert_eq!(rt.children(div).len(), 4);
    }

    #[test]
    fn changing_a_tag_replaces_the_subtree() {
        let mut rt = RenderTest::new();
        let subtree = |tag: &str| {
            Element::host(
                "div",
                Props::new(),
                [Element::host(tag, Props::new().attr("id", "x"), ["inner"])],
            )
        };
        rt.render_to_idle(subtree("span"));
        let div = rt.only_child(rt.container());
        let span = rt.only_child(div);
        rt.take_ops();

        rt.render_to_idle(subtree("article"));
        let ops = rt.take_ops();
        // the old subtree detaches at its root, not node by node
        let removals: Vec<&HostOp> = ops
            .iter()
            .filter(|op| matches!(op, HostOp::RemoveChild { .. }))
            .collect();
        assert_eq!(
            removals,
            vec![&HostOp::RemoveChild {
                parent: div,
                child: span
            }]
        );
        let article = rt.only_child(div);
        assert_ne!(article, span);
        assert_eq!(rt.tag_of(article), Some("article".to_owned()));
        assert_eq!(rt.text_of(rt.only_child(article)), Some("inner".to_owned()));
    }

    #[test]
    fn reordering_same_type_children_updates_in_place() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(row(&["a", "b"]));
        let div = rt.only_child(rt.container());
        let kids = rt.children(div);
        rt.take_ops();

        rt.render_to_idle(row(&["b", "a"]));
        // no keys: a swap is two in-place prop writes, never node movement
        assert_eq!(
            rt.take_ops(),
            vec![
                HostOp::SetProperty {
                    node: kids[0],
                    key: "name".to_owned()
                },
                HostOp::SetProperty {
                    node: kids[1],
                    key: "name".to_owned()
                },
            ]
        );
        assert_eq!(rt.children(div), kids);
    }

    #[test]
    fn text_changes_write_node_value_in_place() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(Element::host("div", Props::new(), ["hello"]));
        let div = rt.only_child(rt.container());
        let text = rt.only_child(div);
        rt.take_ops();

        rt.render_to_idle(Element::host("div", Props::new(), ["goodbye"]));
        assert_eq!(
            rt.take_ops(),
            vec![HostOp::SetProperty {
                node: text,
                key: NODE_VALUE.to_owned()
            }]
        );
        assert_eq!(rt.text_of(text), Some("goodbye".to_owned()));
    }

    #[test]
    fn flipping_types_across_positions_rebuilds_both() {
        let mut rt = RenderTest::new();
        let before = Element::host(
            "div",
            Props::new(),
            [
                Element::text("lead"),
                Element::host("span", Props::new(), Vec::<Element>::new()),
            ],
        );
        let after = Element::host(
            "div",
            Props::new(),
            [
                Element::host("span", Props::new(), Vec::<Element>::new()),
                Element::text("lead"),
            ],
        );
        rt.render_to_idle(before);
        let div = rt.only_child(rt.container());
        rt.take_ops();

        rt.render_to_idle(after);
        let ops = rt.take_ops();
        let removals = ops
            .iter()
            .filter(|op| matches!(op, HostOp::RemoveChild { .. }))
            .count();
        assert_eq!(removals, 2);

        let kids = rt.children(div);
        assert_eq!(rt.tag_of(kids[0]), Some("span".to_owned()));
        assert_eq!(rt.text_of(kids[1]), Some("lead".to_owned()));
    }

    #[test]
    fn levels_can_empty_and_refill() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(row(&[]));
        let div = rt.only_child(rt.container());
        assert!(rt.children(div).is_empty());

        rt.render_to_idle(row(&["a"]));
        assert_eq!(rt.children(div).len(), 1);

        rt.render_to_idle(row(&[]));
        assert!(rt.children(div).is_empty());
    }

    #[test]
    fn superseding_resets_pending_deletions() {
        let mut rt = RenderTest::new();
        rt.render_to_idle(row(&["a", "b", "c"]));
        let div = rt.only_child(rt.container());
        rt.take_ops();

        // start shrinking, stop after the level diff marked b and c
        rt.render(row(&["a"]));
        rt.step_units(2);
        assert_eq!(rt.runtime().deletions.len(), 2);

        // changing course must not let the stale deletions leak through
        rt.render(row(&["a", "b", "c"]));
        assert!(rt.runtime().deletions.is_empty());
        rt.pump_until_idle();
        assert!(!rt
            .take_ops()
            .iter()
            .any(|op| matches!(op, HostOp::RemoveChild { .. })));
        assert_eq!(rt.children(div).len(), 3);
    }

    #[test]
    fn text_without_payload_is_rejected() {
        let mut rt = RenderTest::new();
        rt.render(Element::host(
            "div",
            Props::new(),
            [Element::new(ElementKind::Text, Props::new())],
        ));
        let result = rt.runtime().run_to_completion();
        assert!(matches!(result, Err(RenderError::InvalidElement { .. })));
    }
}
