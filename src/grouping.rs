use std::collections::HashMap;

use crate::formatting::format_quantity;
use crate::invoice::LineItem;

/// A titled block of line items sharing the same (uppercased) category.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemGroup {
    /// The uppercased category label.
    pub title: String,
    /// The `(description, quantity as text)` pairs, in submission order.
    pub rows: Vec<(String, String)>,
}

/// Group the line items by their uppercased type.
///
/// Groups come out in the order their category is first met and rows keep their
/// submission order inside a group. Types differing only by case always land in the
/// same group. An empty type is a group key like any other.
pub fn group_line_items(items: &[LineItem]) -> Vec<ItemGroup> {
    let mut groups: Vec<ItemGroup> = Vec::new();
    let mut group_positions: HashMap<String, usize> = HashMap::new();

    for item in items {
        let group_key = item.item_type.to_uppercase();
        let position = *group_positions.entry(group_key.clone()).or_insert_with(|| {
            groups.push(ItemGroup {
                title: group_key,
                rows: Vec::new(),
            });
            groups.len() - 1
        });

        groups[position]
            .rows
            .push((item.description.clone(), format_quantity(item.quantity)));
    }

    groups
}
