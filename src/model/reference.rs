//! Reference tokens: stable, host-facing addresses for items.
//!
//! Each item gets a small positive integer, unique among its siblings and
//! assigned the first time someone asks for it. A reference is the
//! `/`-joined chain of tokens from the template root down to the item, e.g.
//! `"1/3/2"`. Tokens are not persisted; they are re-derived after a load.

use super::{Item, Template};

/// Smallest positive integer not already used by `siblings`.
fn smallest_unused(siblings: &[Item]) -> u32 {
    let mut used: Vec<u32> = siblings.iter().filter_map(Item::ref_token).collect();
    used.sort_unstable();
    let mut candidate = 1;
    for token in used {
        if token == candidate {
            candidate += 1;
        } else if token > candidate {
            break;
        }
    }
    candidate
}

fn token_for(siblings: &mut [Item], index: usize) -> Option<u32> {
    if let Some(token) = siblings.get(index)?.ref_token() {
        return Some(token);
    }
    let token = smallest_unused(siblings);
    siblings[index].set_ref_token(Some(token));
    Some(token)
}

impl Template {
    /// Reference of the item at `path`, assigning tokens along the way.
    pub fn build_reference(&mut self, path: &[usize]) -> Option<String> {
        let mut tokens = Vec::with_capacity(path.len());
        let mut level: &mut [Item] = self.items_mut();
        for &index in path {
            tokens.push(token_for(level, index)?.to_string());
            level = level[index].children_mut().as_mut_slice();
        }
        if tokens.is_empty() {
            return None;
        }
        Some(tokens.join("/"))
    }

    /// Index path of the item a reference points to.
    pub fn resolve_reference(&self, reference: &str) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut level = self.items();
        for part in reference.split('/') {
            let token: u32 = part.parse().ok()?;
            let index = level.iter().position(|item| item.ref_token() == Some(token))?;
            path.push(index);
            level = level[index].children();
        }
        Some(path)
    }

    pub fn find_by_reference(&self, reference: &str) -> Option<&Item> {
        let path = self.resolve_reference(reference)?;
        self.item(&path)
    }

    pub fn find_by_reference_mut(&mut self, reference: &str) -> Option<&mut Item> {
        let path = self.resolve_reference(reference)?;
        self.item_mut(&path)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Item, ItemKind, Template};

    fn template() -> Template {
        let page = Item::new(ItemKind::Page).with_children(vec![
            Item::new(ItemKind::Text).named("a"),
            Item::new(ItemKind::Text).named("b"),
            Item::new(ItemKind::Frame)
                .named("c")
                .with_children(vec![Item::new(ItemKind::Image).named("d")]),
        ]);
        Template::from_items(vec![page, Item::new(ItemKind::Page)])
    }

    #[test]
    fn tokens_are_assigned_lazily_and_minimally() {
        let mut t = template();
        assert_eq!(t.build_reference(&[0, 2, 0]).as_deref(), Some("1/1/1"));
        assert_eq!(t.build_reference(&[0, 0]).as_deref(), Some("1/2"));
        assert_eq!(t.build_reference(&[1]).as_deref(), Some("2"));
        // stable once assigned
        assert_eq!(t.build_reference(&[0, 2, 0]).as_deref(), Some("1/1/1"));
    }

    #[test]
    fn freed_tokens_are_reused() {
        let mut t = template();
        t.build_reference(&[0, 0]);
        t.build_reference(&[0, 1]);
        t.build_reference(&[0, 2]);
        t.item_mut(&[0]).unwrap().remove_child(0);
        t.item_mut(&[0]).unwrap().insert_child(Item::new(ItemKind::Text).named("e"), -1);
        assert_eq!(t.build_reference(&[0, 2]).as_deref(), Some("1/1"));
    }

    #[test]
    fn sibling_tokens_stay_unique() {
        let mut t = template();
        for i in 0..3 {
            t.build_reference(&[0, i]);
        }
        let mut tokens: Vec<u32> = t.items()[0]
            .children()
            .iter()
            .map(|c| c.ref_token().unwrap())
            .collect();
        tokens.sort();
        assert_eq!(tokens, vec![1, 2, 3]);
    }

    #[test]
    fn references_resolve_back() {
        let mut t = template();
        let reference = t.build_reference(&[0, 2, 0]).unwrap();
        assert_eq!(t.find_by_reference(&reference).unwrap().name, "d");
        assert_eq!(t.resolve_reference(&reference), Some(vec![0, 2, 0]));

        // reordering keeps the reference valid
        t.item_mut(&[0]).unwrap().move_child(2, 0);
        assert_eq!(t.find_by_reference(&reference).unwrap().name, "d");
    }

    #[test]
    fn bad_references_resolve_to_none() {
        let mut t = template();
        t.build_reference(&[0, 1]);
        assert!(t.find_by_reference("1/9").is_none());
        assert!(t.find_by_reference("1/x").is_none());
        assert!(t.find_by_reference("").is_none());
        assert!(t.build_reference(&[4]).is_none());
        assert!(t.build_reference(&[]).is_none());
    }
}
