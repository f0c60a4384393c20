//! Category tree walks, attribute inheritance and product value checks.
//!
//! Everything here works on plain data loaded by the services, so the rules
//! can be exercised without a database.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::{
    dto::attributes::AttributeValueInput,
    models::{AttributeType, Category, CategoryNode, ProductAttribute},
};

/// The parent link of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLink {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub is_deleted: bool,
}

pub fn index_links(links: &[CategoryLink]) -> HashMap<Uuid, CategoryLink> {
    links.iter().map(|link| (link.id, *link)).collect()
}

/// Ids from the root down to `id` (inclusive).
///
/// Returns an empty chain when `id` itself is missing or deleted. The walk
/// stops at a missing or deleted parent and when a cycle is detected.
pub fn ancestor_chain(links: &HashMap<Uuid, CategoryLink>, id: Uuid) -> Vec<Uuid> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(id);

    while let Some(cursor) = current {
        let Some(link) = links.get(&cursor) else { break };
        if link.is_deleted || !seen.insert(cursor) {
            break;
        }
        chain.push(cursor);
        current = link.parent_id;
    }

    chain.reverse();
    chain
}

/// `root` and every non-deleted category below it.
pub fn descendants(links: &[CategoryLink], root: Uuid) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links.iter().filter(|l| !l.is_deleted) {
        if let Some(parent) = link.parent_id {
            children.entry(parent).or_default().push(link.id);
        }
    }

    let mut out = vec![root];
    let mut seen: HashSet<Uuid> = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        for child in children.get(&id).into_iter().flatten() {
            if seen.insert(*child) {
                out.push(*child);
                stack.push(*child);
            }
        }
    }
    out
}

/// True when making `new_parent` the parent of `id` would put `id` among
/// its own ancestors.
pub fn would_create_cycle(links: &HashMap<Uuid, CategoryLink>, id: Uuid, new_parent: Uuid) -> bool {
    let mut seen = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(cursor) = current {
        if cursor == id {
            return true;
        }
        if !seen.insert(cursor) {
            // existing cycle above us that does not involve `id`
            return false;
        }
        current = links.get(&cursor).and_then(|l| l.parent_id);
    }
    false
}

/// Nest live categories under their parents, ordered by priority then name.
pub fn build_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<&Category>> = HashMap::new();
    for category in categories {
        by_parent.entry(category.parent_id).or_default().push(category);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
    }

    let mut visited = HashSet::new();
    build_level(&by_parent, None, &mut visited)
}

fn build_level(
    by_parent: &HashMap<Option<Uuid>, Vec<&Category>>,
    parent: Option<Uuid>,
    visited: &mut HashSet<Uuid>,
) -> Vec<CategoryNode> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(siblings.len());
    for category in siblings {
        if !visited.insert(category.id) {
            continue;
        }
        nodes.push(CategoryNode {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            priority: category.priority,
            image: category.image.clone(),
            children: build_level(by_parent, Some(category.id), visited),
        });
    }
    nodes
}

/// An attribute bound directly on one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub category_id: Uuid,
    pub attribute_id: Uuid,
    pub is_required: bool,
    pub sort_order: i32,
    pub is_filterable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub attribute_id: Uuid,
    pub is_required: bool,
    pub sort_order: i32,
    pub is_filterable: bool,
    pub source_category_id: Uuid,
    pub inherited: bool,
}

/// Merge the bindings declared along `chain` (root first, target last).
///
/// The deepest binding of an attribute wins. Bindings on categories outside
/// the chain are ignored.
pub fn resolve_inherited_bindings(chain: &[Uuid], bindings: &[Binding]) -> Vec<ResolvedBinding> {
    let Some(&target) = chain.last() else {
        return Vec::new();
    };

    let mut by_category: HashMap<Uuid, Vec<&Binding>> = HashMap::new();
    for binding in bindings {
        by_category.entry(binding.category_id).or_default().push(binding);
    }

    let mut effective: HashMap<Uuid, ResolvedBinding> = HashMap::new();
    for level in chain {
        for binding in by_category.get(level).into_iter().flatten() {
            effective.insert(
                binding.attribute_id,
                ResolvedBinding {
                    attribute_id: binding.attribute_id,
                    is_required: binding.is_required,
                    sort_order: binding.sort_order,
                    is_filterable: binding.is_filterable,
                    source_category_id: binding.category_id,
                    inherited: binding.category_id != target,
                },
            );
        }
    }

    let mut resolved: Vec<ResolvedBinding> = effective.into_values().collect();
    resolved.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.attribute_id.cmp(&b.attribute_id))
    });
    resolved
}

/// What value validation needs to know about an attribute.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub id: Uuid,
    pub name: String,
    pub data_type: AttributeType,
    pub option_ids: HashSet<Uuid>,
}

/// A row ready to be written to `product_attribute_values`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewValue {
    pub attribute_id: Uuid,
    pub value_text: Option<String>,
    pub value_number: Option<f64>,
    pub value_bool: Option<bool>,
    pub option_id: Option<Uuid>,
}

impl NewValue {
    fn empty(attribute_id: Uuid) -> Self {
        Self {
            attribute_id,
            value_text: None,
            value_number: None,
            value_bool: None,
            option_id: None,
        }
    }
}

/// Check a full replacement set of product values against the effective
/// bindings of the product's category.
pub fn validate_product_values(
    bindings: &[ResolvedBinding],
    specs: &HashMap<Uuid, AttributeSpec>,
    inputs: &[AttributeValueInput],
) -> Result<Vec<NewValue>, String> {
    let allowed: HashMap<Uuid, &ResolvedBinding> =
        bindings.iter().map(|b| (b.attribute_id, b)).collect();
    let name_of = |id: &Uuid| {
        specs
            .get(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for input in inputs {
        let id = input.attribute_id;
        if !allowed.contains_key(&id) {
            return Err(format!(
                "attribute {} is not available for this category",
                name_of(&id)
            ));
        }
        if !seen.insert(id) {
            return Err(format!("attribute {} is given more than once", name_of(&id)));
        }
        let spec = specs
            .get(&id)
            .ok_or_else(|| format!("attribute {id} does not exist"))?;

        match spec.data_type {
            AttributeType::Text => {
                let text = input
                    .value_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| format!("attribute {} expects a text value", spec.name))?;
                rows.push(NewValue {
                    value_text: Some(text.to_string()),
                    ..NewValue::empty(id)
                });
            }
            AttributeType::Number => {
                let number = input
                    .value_number
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| format!("attribute {} expects a number", spec.name))?;
                rows.push(NewValue {
                    value_number: Some(number),
                    ..NewValue::empty(id)
                });
            }
            AttributeType::Boolean => {
                let flag = input
                    .value_bool
                    .ok_or_else(|| format!("attribute {} expects true or false", spec.name))?;
                rows.push(NewValue {
                    value_bool: Some(flag),
                    ..NewValue::empty(id)
                });
            }
            AttributeType::Select | AttributeType::MultiSelect => {
                let options = &input.option_ids;
                let single = spec.data_type == AttributeType::Select;
                if single && options.len() != 1 {
                    return Err(format!("attribute {} expects exactly one option", spec.name));
                }
                if options.is_empty() {
                    return Err(format!("attribute {} expects at least one option", spec.name));
                }
                let mut picked = HashSet::new();
                for option in options {
                    if !spec.option_ids.contains(option) {
                        return Err(format!(
                            "option {option} does not belong to attribute {}",
                            spec.name
                        ));
                    }
                    if !picked.insert(*option) {
                        return Err(format!("option {option} repeated for attribute {}", spec.name));
                    }
                    rows.push(NewValue {
                        option_id: Some(*option),
                        ..NewValue::empty(id)
                    });
                }
            }
        }
    }

    if let Some(missing) = bindings
        .iter()
        .find(|b| b.is_required && !seen.contains(&b.attribute_id))
    {
        return Err(format!(
            "attribute {} is required",
            name_of(&missing.attribute_id)
        ));
    }

    Ok(rows)
}

/// Human readable rendering used by the comparison table.
pub fn display_value(value: &ProductAttribute) -> Option<String> {
    let raw = match value.data_type {
        AttributeType::Text => value.value_text.clone(),
        AttributeType::Number => value.value_number.map(format_number),
        AttributeType::Boolean => value.value_bool.map(|b| if b { "Yes" } else { "No" }.to_string()),
        AttributeType::Select | AttributeType::MultiSelect => {
            (!value.options.is_empty()).then(|| value.options.join(", "))
        }
    }?;

    Some(match (&value.unit, value.data_type) {
        (Some(unit), AttributeType::Number) => format!("{raw} {unit}"),
        _ => raw,
    })
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(id: Uuid, parent: Option<Uuid>) -> CategoryLink {
        CategoryLink {
            id,
            parent_id: parent,
            is_deleted: false,
        }
    }

    fn bind(category: Uuid, attribute: Uuid, required: bool, sort: i32, filter: bool) -> Binding {
        Binding {
            category_id: category,
            attribute_id: attribute,
            is_required: required,
            sort_order: sort,
            is_filterable: filter,
        }
    }

    #[test]
    fn ancestor_chain_runs_root_first() {
        let (root, mid, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let links = index_links(&[link(root, None), link(mid, Some(root)), link(leaf, Some(mid))]);

        assert_eq!(ancestor_chain(&links, leaf), vec![root, mid, leaf]);
        assert_eq!(ancestor_chain(&links, root), vec![root]);
        assert!(ancestor_chain(&links, Uuid::new_v4()).is_empty());
    }

    #[test]
    fn ancestor_chain_stops_at_deleted_parent_and_cycles() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut deleted = link(a, None);
        deleted.is_deleted = true;
        let links = index_links(&[deleted, link(b, Some(a)), link(c, Some(b))]);
        assert_eq!(ancestor_chain(&links, c), vec![b, c]);

        let cyclic = index_links(&[link(a, Some(b)), link(b, Some(a))]);
        assert_eq!(ancestor_chain(&cyclic, a), vec![b, a]);
    }

    #[test]
    fn descendants_skip_deleted_branches() {
        let (root, kept, gone, below_gone) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut deleted = link(gone, Some(root));
        deleted.is_deleted = true;
        let links = [
            link(root, None),
            link(kept, Some(root)),
            deleted,
            link(below_gone, Some(gone)),
        ];

        let found: HashSet<Uuid> = descendants(&links, root).into_iter().collect();
        assert_eq!(found, HashSet::from([root, kept]));
    }

    #[test]
    fn detects_reparenting_cycles() {
        let (root, mid, leaf) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let links = index_links(&[link(root, None), link(mid, Some(root)), link(leaf, Some(mid))]);

        assert!(would_create_cycle(&links, root, leaf));
        assert!(would_create_cycle(&links, mid, mid));
        assert!(!would_create_cycle(&links, leaf, root));
    }

    #[test]
    fn builds_sorted_tree() {
        let now = Utc::now();
        let cat = |name: &str, parent: Option<Uuid>, priority: i32| Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            parent_id: parent,
            priority,
            image: None,
            created_at: now,
        };
        let electronics = cat("Electronics", None, 1);
        let home = cat("Home", None, 0);
        let phones = cat("Phones", Some(electronics.id), 0);
        let laptops = cat("Laptops", Some(electronics.id), 0);
        let orphan = cat("Orphan", Some(Uuid::new_v4()), 0);

        let tree = build_tree(&[electronics.clone(), home, phones, laptops, orphan]);
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Home", "Electronics"]);

        let children: Vec<&str> = tree[1].children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(children, ["Laptops", "Phones"]);
    }

    #[test]
    fn child_binding_overrides_parent() {
        let (root, leaf) = (Uuid::new_v4(), Uuid::new_v4());
        let (brand, color, ram) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let bindings = vec![
            bind(root, brand, false, 1, true),
            bind(root, color, false, 3, false),
            bind(leaf, brand, true, 0, false),
            bind(leaf, ram, true, 2, true),
            bind(Uuid::new_v4(), Uuid::new_v4(), true, 0, true),
        ];

        let resolved = resolve_inherited_bindings(&[root, leaf], &bindings);
        assert_eq!(resolved.len(), 3);

        let first = &resolved[0];
        assert_eq!(first.attribute_id, brand);
        assert!(first.is_required);
        assert!(!first.is_filterable);
        assert_eq!(first.source_category_id, leaf);
        assert!(!first.inherited);

        assert_eq!(resolved[1].attribute_id, ram);

        let inherited = &resolved[2];
        assert_eq!(inherited.attribute_id, color);
        assert_eq!(inherited.source_category_id, root);
        assert!(inherited.inherited);
    }

    #[test]
    fn empty_chain_resolves_to_nothing() {
        let binding = bind(Uuid::new_v4(), Uuid::new_v4(), true, 0, true);
        assert!(resolve_inherited_bindings(&[], &[binding]).is_empty());
    }

    fn spec(name: &str, data_type: AttributeType, options: &[Uuid]) -> AttributeSpec {
        AttributeSpec {
            id: Uuid::new_v4(),
            name: name.to_string(),
            data_type,
            option_ids: options.iter().copied().collect(),
        }
    }

    fn resolved(attribute_id: Uuid, required: bool) -> ResolvedBinding {
        ResolvedBinding {
            attribute_id,
            is_required: required,
            sort_order: 0,
            is_filterable: false,
            source_category_id: Uuid::nil(),
            inherited: false,
        }
    }

    fn input(attribute_id: Uuid) -> AttributeValueInput {
        AttributeValueInput {
            attribute_id,
            value_text: None,
            value_number: None,
            value_bool: None,
            option_ids: Vec::new(),
        }
    }

    #[test]
    fn accepts_values_matching_types() {
        let (red, blue) = (Uuid::new_v4(), Uuid::new_v4());
        let weight = spec("Weight", AttributeType::Number, &[]);
        let colors = spec("Colors", AttributeType::MultiSelect, &[red, blue]);
        let bindings = vec![resolved(weight.id, true), resolved(colors.id, false)];
        let specs = HashMap::from([(weight.id, weight.clone()), (colors.id, colors.clone())]);

        let rows = validate_product_values(
            &bindings,
            &specs,
            &[
                AttributeValueInput {
                    value_number: Some(1.5),
                    ..input(weight.id)
                },
                AttributeValueInput {
                    option_ids: vec![red, blue],
                    ..input(colors.id)
                },
            ],
        )
        .expect("valid values");

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value_number, Some(1.5));
        assert_eq!(rows[1].option_id, Some(red));
    }

    #[test]
    fn rejects_missing_required_and_foreign_attributes() {
        let weight = spec("Weight", AttributeType::Number, &[]);
        let specs = HashMap::from([(weight.id, weight.clone())]);
        let bindings = vec![resolved(weight.id, true)];

        let err = validate_product_values(&bindings, &specs, &[]).unwrap_err();
        assert_eq!(err, "attribute Weight is required");

        let stranger = Uuid::new_v4();
        let err = validate_product_values(&bindings, &specs, &[input(stranger)]).unwrap_err();
        assert!(err.contains("not available"));
    }

    #[test]
    fn rejects_type_mismatches() {
        let opt = Uuid::new_v4();
        let name = spec("Model", AttributeType::Text, &[]);
        let brand = spec("Brand", AttributeType::Select, &[opt]);
        let specs = HashMap::from([(name.id, name.clone()), (brand.id, brand.clone())]);
        let bindings = vec![resolved(name.id, false), resolved(brand.id, false)];

        let blank = AttributeValueInput {
            value_text: Some("   ".into()),
            ..input(name.id)
        };
        assert!(validate_product_values(&bindings, &specs, &[blank]).is_err());

        let two = AttributeValueInput {
            option_ids: vec![opt, opt],
            ..input(brand.id)
        };
        let err = validate_product_values(&bindings, &specs, &[two]).unwrap_err();
        assert!(err.contains("exactly one"));

        let foreign = AttributeValueInput {
            option_ids: vec![Uuid::new_v4()],
            ..input(brand.id)
        };
        let err = validate_product_values(&bindings, &specs, &[foreign]).unwrap_err();
        assert!(err.contains("does not belong"));
    }

    #[test]
    fn rejects_duplicate_attribute_entries() {
        let flag = spec("Wireless", AttributeType::Boolean, &[]);
        let specs = HashMap::from([(flag.id, flag.clone())]);
        let bindings = vec![resolved(flag.id, false)];
        let yes = AttributeValueInput {
            value_bool: Some(true),
            ..input(flag.id)
        };

        let err = validate_product_values(&bindings, &specs, &[yes.clone(), yes]).unwrap_err();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn displays_values_with_units() {
        let value = ProductAttribute {
            attribute_id: Uuid::new_v4(),
            name: "Screen".into(),
            data_type: AttributeType::Number,
            unit: Some("in".into()),
            value_text: None,
            value_number: Some(6.0),
            value_bool: None,
            option_ids: Vec::new(),
            options: Vec::new(),
        };
        assert_eq!(display_value(&value).as_deref(), Some("6 in"));

        let multi = ProductAttribute {
            data_type: AttributeType::MultiSelect,
            unit: None,
            value_number: None,
            options: vec!["Red".into(), "Blue".into()],
            ..value.clone()
        };
        assert_eq!(display_value(&multi).as_deref(), Some("Red, Blue"));

        let unset = ProductAttribute {
            data_type: AttributeType::Boolean,
            value_number: None,
            ..value
        };
        assert_eq!(display_value(&unset), None);
    }
}
