//! Parser for the `key: value` product blocks admins paste into the chat.
//!
//! ```text
//! id: PRD001
//! nama: Kaos Polos
//! harga: 50000
//! stock: 10
//! deskripsi: Cotton tee
//! link1: https://example.com/a
//! ```
//!
//! Keys are case-insensitive and accept English or Indonesian names. Numbers
//! are strict: anything that is not a plain non-negative integer is rejected.

use tracing::debug;

use crate::domain::{ProductDraft, ProductPatch, MAX_LINKS};
use crate::error::CatalogError;

pub const ADD_TEMPLATE: &str =
    "id:\nname:\nprice:\nstock:\ndescription:\nlink1:\nlink2:\nlink3:";

const MAX_ID_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Name,
    Price,
    Stock,
    Description,
    Link(usize),
}

fn field_for(key: &str) -> Option<Field> {
    let field = match key {
        "id" => Field::Id,
        "name" | "nama" => Field::Name,
        "price" | "harga" => Field::Price,
        "stock" | "stok" => Field::Stock,
        "description" | "deskripsi" => Field::Description,
        "link1" => Field::Link(0),
        "link2" => Field::Link(1),
        "link3" => Field::Link(2),
        _ => return None,
    };
    Some(field)
}

/// Every recognised field of one block. `None` means the key was absent.
#[derive(Debug, Default, PartialEq, Eq)]
struct ProductBlock {
    id: Option<String>,
    name: Option<String>,
    price: Option<u64>,
    stock: Option<u32>,
    description: Option<String>,
    links: Option<[Option<String>; MAX_LINKS]>,
}

impl ProductBlock {
    fn links(&self) -> Option<Vec<String>> {
        self.links
            .as_ref()
            .map(|slots| slots.iter().flatten().cloned().collect())
    }
}

fn invalid(message: impl Into<String>) -> CatalogError {
    CatalogError::ValidationError(message.into())
}

fn parse_number<T: std::str::FromStr>(label: &str, raw: &str) -> Result<T, CatalogError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("{label} must be a whole number, got `{raw}`.")));
    }
    raw.parse()
        .map_err(|_| invalid(format!("{label} is too large: `{raw}`.")))
}

fn parse_block(text: &str) -> Result<ProductBlock, CatalogError> {
    let mut block = ProductBlock::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            return Err(invalid(format!("`{line}` is not in `key: value` form.")));
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        let Some(field) = field_for(&key) else {
            debug!(key = %key, "Ignoring unknown product key");
            continue;
        };
        match field {
            Field::Id => block.id = Some(value.to_string()),
            Field::Name => block.name = Some(value.to_string()),
            Field::Price => block.price = Some(parse_number("Price", value)?),
            Field::Stock => block.stock = Some(parse_number("Stock", value)?),
            Field::Description => block.description = Some(value.to_string()),
            Field::Link(slot) => {
                let links = block.links.get_or_insert_with(Default::default);
                links[slot] = (!value.is_empty()).then(|| value.to_string());
            }
        }
    }
    Ok(block)
}

/// Product ids end up in store keys and button callbacks, so they are kept
/// to letters, digits, `_` and `-`.
pub fn validate_product_id(id: &str) -> Result<(), CatalogError> {
    if id.is_empty() {
        return Err(invalid("Product id must not be empty."));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(invalid(format!("Product id is longer than {MAX_ID_LEN} characters.")));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(invalid("Product id may only contain letters, digits, `_` and `-`."));
    }
    Ok(())
}

/// Parses a full block for a new product. Returns the id and the draft.
pub fn parse_new_product(text: &str) -> Result<(String, ProductDraft), CatalogError> {
    let block = parse_block(text)?;
    let links = block.links().unwrap_or_default();

    let id = block.id.ok_or_else(|| invalid("Missing required key: id"))?;
    validate_product_id(&id)?;
    let name = block
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid("Missing required key: name"))?;
    let price = block.price.ok_or_else(|| invalid("Missing required key: price"))?;
    let stock = block.stock.ok_or_else(|| invalid("Missing required key: stock"))?;

    let draft = ProductDraft::new(name, price, stock)
        .with_description(block.description.unwrap_or_default())
        .with_links(links);
    Ok((id, draft))
}

/// Parses an edit block. Only present keys end up in the patch; any link key
/// replaces the whole link set.
pub fn parse_product_patch(target_id: &str, text: &str) -> Result<ProductPatch, CatalogError> {
    let block = parse_block(text)?;
    if let Some(id) = block.id.as_deref() {
        if id != target_id {
            return Err(invalid("The product id cannot be changed."));
        }
    }
    if matches!(block.name.as_deref(), Some("")) {
        return Err(invalid("Name must not be empty."));
    }

    let patch = ProductPatch {
        links: block.links(),
        name: block.name,
        price: block.price,
        stock: block.stock,
        description: block.description,
    };
    if patch.is_empty() {
        return Err(invalid(
            "No recognised keys. Send at least one of name, price, stock, description, link1-3.",
        ));
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indonesian_block() {
        let text = "id: PRD001\nnama: Kaos Polos\nharga: 50000\nstock: 10";
        let (id, draft) = parse_new_product(text).unwrap();
        assert_eq!(id, "PRD001");
        assert_eq!(draft.name, "Kaos Polos");
        assert_eq!(draft.price, 50000);
        assert_eq!(draft.stock, 10);
        assert!(draft.links.is_empty());
    }

    #[test]
    fn keys_are_case_insensitive_and_links_keep_their_urls() {
        let text = "ID: A-1\nName: Mug\nPRICE: 25000\nStok: 3\nLink2: https://shop.example/mug";
        let (_, draft) = parse_new_product(text).unwrap();
        assert_eq!(draft.links, vec!["https://shop.example/mug".to_string()]);
    }

    #[test]
    fn strict_numbers_are_enforced() {
        for bad in ["50.000", "-5", "abc", "12.5", ""] {
            let text = format!("id: X\nname: Mug\nprice: {bad}\nstock: 1");
            let err = parse_new_product(&text).unwrap_err();
            assert!(matches!(err, CatalogError::ValidationError(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn missing_required_keys_are_named() {
        let err = parse_new_product("id: X\nname: Mug\nprice: 1").unwrap_err();
        assert_eq!(err, CatalogError::ValidationError("Missing required key: stock".into()));
    }

    #[test]
    fn ids_with_separators_are_rejected() {
        assert!(validate_product_id("PRD:1").is_err());
        assert!(validate_product_id("PRD 1").is_err());
        assert!(validate_product_id("Produk_01").is_ok());
    }

    #[test]
    fn patch_contains_only_present_keys() {
        let patch = parse_product_patch("PRD001", "harga: 45000").unwrap();
        assert_eq!(patch.price, Some(45000));
        assert_eq!(patch.name, None);
        assert_eq!(patch.links, None);
    }

    #[test]
    fn empty_link_value_clears_the_set() {
        let patch = parse_product_patch("PRD001", "link1:").unwrap();
        assert_eq!(patch.links, Some(Vec::new()));
    }

    #[test]
    fn patch_without_recognised_keys_is_rejected() {
        assert!(parse_product_patch("PRD001", "colour: red").is_err());
        assert!(parse_product_patch("PRD001", "id: OTHER\nstock: 1").is_err());
    }
}
