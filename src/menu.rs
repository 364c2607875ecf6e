//! Defines the navigation [`Menu`] and its [`MenuItem`]s.

use crate::value::{href, list, object, text};
use gtmpl_value::Value;
use serde::Deserialize;

/// A menu link as returned by the CMS's menu items endpoint.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub url: String,

    /// The `id` of the parent item, empty for top-level items.
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub weight: Option<i64>,

    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl MenuItem {
    fn is_root(&self) -> bool {
        self.parent.as_deref().map_or(true, str::is_empty)
    }
}

/// A node in the menu tree.
#[derive(Clone, Debug, PartialEq)]
pub struct MenuNode {
    pub item: MenuItem,
    pub children: Vec<MenuNode>,
}

/// A menu as a tree built from the items' parent ids. Siblings are ordered
/// by weight, then by the CMS's order; disabled links are dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Menu {
    pub tree: Vec<MenuNode>,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Menu {
        let mut items: Vec<MenuItem> = items.into_iter().filter(|item| item.enabled).collect();
        items.sort_by_key(|item| item.weight.unwrap_or(0));

        let mut tree: Vec<MenuNode> = items
            .iter()
            .filter(|item| item.is_root() || !has_item(&items, item.parent.as_deref()))
            .map(|item| node(item, &items, &mut vec![item.id.as_str()]))
            .collect();

        // Items whose parents form a cycle are unreachable from any root.
        // The first unplaced member of each cycle becomes a root.
        for item in &items {
            if !tree.iter().any(|root| root.contains(&item.id)) {
                tree.push(node(item, &items, &mut vec![item.id.as_str()]));
            }
        }
        Menu { tree }
    }
}

impl MenuNode {
    fn contains(&self, id: &str) -> bool {
        self.item.id == id || self.children.iter().any(|child| child.contains(id))
    }
}

fn has_item(items: &[MenuItem], id: Option<&str>) -> bool {
    id.map_or(false, |id| items.iter().any(|item| item.id == id))
}

// `ancestors` guards against parent cycles in malformed menus.
fn node<'a>(item: &'a MenuItem, items: &'a [MenuItem], ancestors: &mut Vec<&'a str>) -> MenuNode {
    let mut children = Vec::new();
    for child in items
        .iter()
        .filter(|child| child.parent.as_deref() == Some(item.id.as_str()))
    {
        if ancestors.contains(&child.id.as_str()) {
            continue;
        }
        ancestors.push(&child.id);
        children.push(node(child, items, ancestors));
        ancestors.pop();
    }
    MenuNode {
        item: item.clone(),
        children,
    }
}

impl From<&MenuNode> for Value {
    fn from(node: &MenuNode) -> Value {
        object(vec![
            ("id", text(&node.item.id)),
            ("title", text(&node.item.title)),
            ("url", href(&node.item.url)),
            ("has_children", Value::Bool(!node.children.is_empty())),
            ("children", list(&node.children)),
        ])
    }
}

impl From<&Menu> for Value {
    fn from(menu: &Menu) -> Value {
        list(&menu.tree)
    }
}
