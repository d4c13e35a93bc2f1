use crate::actor_framework::Entity;
use crate::domain::{Product, ProductDraft, ProductPatch, MAX_LINKS};
use crate::store::{Record, WriteOp};

pub const PRODUCT_INDEX: &str = "products";

pub fn product_key(id: &str) -> String {
    format!("product:{id}")
}

/// Set of redirect links for one product, used for random picks.
pub fn product_links_key(id: &str) -> String {
    format!("product_links:{id}")
}

fn field<'a>(record: &'a Record, name: &str) -> Result<&'a str, String> {
    record
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing field {name}"))
}

impl Entity for Product {
    type CreateParams = ProductDraft;
    type Patch = ProductPatch;
    type Action = (); // No custom actions for now
    type ActionResult = ();

    const KIND: &'static str = "product";
    const INDEX_KEY: &'static str = PRODUCT_INDEX;

    fn id(&self) -> &str {
        &self.id
    }

    fn record_key(id: &str) -> String {
        product_key(id)
    }

    fn from_create_params(id: String, params: ProductDraft) -> Result<Self, String> {
        if params.links.len() > MAX_LINKS {
            return Err(format!("at most {MAX_LINKS} links are allowed"));
        }
        Ok(Self {
            id,
            name: params.name,
            price: params.price,
            stock: params.stock,
            description: params.description,
            links: params.links,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("name".into(), self.name.clone());
        record.insert("price".into(), self.price.to_string());
        record.insert("stock".into(), self.stock.to_string());
        record.insert("description".into(), self.description.clone());
        // Vec<String> always serializes.
        record.insert(
            "links".into(),
            serde_json::to_string(&self.links).unwrap_or_else(|_| "[]".into()),
        );
        record
    }

    fn from_record(id: &str, record: &Record) -> Result<Self, String> {
        let price = field(record, "price")?
            .parse()
            .map_err(|e| format!("bad price: {e}"))?;
        let stock = field(record, "stock")?
            .parse()
            .map_err(|e| format!("bad stock: {e}"))?;
        let links = match record.get("links") {
            Some(raw) => serde_json::from_str(raw).map_err(|e| format!("bad links: {e}"))?,
            None => Vec::new(),
        };
        Ok(Self {
            id: id.to_string(),
            name: field(record, "name")?.to_string(),
            price,
            stock,
            description: record.get("description").cloned().unwrap_or_default(),
            links,
        })
    }

    fn on_update(&mut self, patch: ProductPatch) -> Result<(), String> {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(links) = patch.links {
            if links.len() > MAX_LINKS {
                return Err(format!("at most {MAX_LINKS} links are allowed"));
            }
            self.links = links;
        }
        Ok(())
    }

    fn handle_action(&mut self, _action: ()) -> Result<(), String> {
        Ok(())
    }

    /// The link index is rebuilt on every write so it never drifts from the record.
    fn companion_writes(&self) -> Vec<WriteOp> {
        let key = product_links_key(&self.id);
        let mut ops = vec![WriteOp::Delete { key: key.clone() }];
        if !self.links.is_empty() {
            ops.push(WriteOp::SetAdd {
                key,
                members: self.links.clone(),
            });
        }
        ops
    }

    fn companion_deletes(&self) -> Vec<WriteOp> {
        vec![WriteOp::Delete {
            key: product_links_key(&self.id),
        }]
    }
}
