//! Product entity and input validation

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::shared::error::AppError;
use crate::store::Document;

const INCOMPLETE_MESSAGE: &str = "Datos incompletos. Se requieren: title, price y category";
const INVALID_PRICE_MESSAGE: &str = "El precio debe ser un número mayor a 0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rate: f64,
    #[serde(deserialize_with = "integral_count")]
    pub count: u64,
}

/// Shell-seeded documents store plain numbers as doubles, so `120.0` counts.
fn integral_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Ok(value as u64)
    } else {
        Err(de::Error::invalid_value(
            de::Unexpected::Float(value),
            &"a non-negative whole number",
        ))
    }
}

/// A catalog product as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Product {
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document))
    }
}

/// Validated caller input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    pub image: String,
}

enum Field<T> {
    Ok(T),
    Missing,
    Invalid,
}

impl<T> Field<T> {
    fn report(&self, name: &str, missing: &mut Vec<String>, invalid: &mut Vec<String>) {
        match self {
            Field::Ok(_) => {}
            Field::Missing => missing.push(name.to_string()),
            Field::Invalid => invalid.push(name.to_string()),
        }
    }

    fn value(self) -> Option<T> {
        match self {
            Field::Ok(value) => Some(value),
            _ => None,
        }
    }
}

fn required_text(input: &Map<String, Value>, key: &str) -> Field<String> {
    match input.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Field::Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => Field::Missing,
        Some(_) => Field::Invalid,
    }
}

fn optional_text(input: &Map<String, Value>, key: &str) -> Field<String> {
    match input.get(key) {
        Some(Value::String(s)) => Field::Ok(s.clone()),
        Some(Value::Null) | None => Field::Ok(String::new()),
        Some(_) => Field::Invalid,
    }
}

fn positive_number(input: &Map<String, Value>, key: &str) -> Field<f64> {
    match input.get(key) {
        Some(Value::Null) | None => Field::Missing,
        Some(value) => match value.as_f64() {
            Some(n) if n.is_finite() && n > 0.0 => Field::Ok(n),
            _ => Field::Invalid,
        },
    }
}

impl NewProduct {
    /// Validate a JSON body. Every failing field is reported at once.
    pub fn from_json(input: &Value) -> Result<Self, AppError> {
        let input = input.as_object().ok_or_else(|| {
            AppError::validation("El cuerpo de la petición debe ser un objeto JSON", Vec::new())
        })?;

        let title = required_text(input, "title");
        let price = positive_number(input, "price");
        let description = optional_text(input, "description");
        let category = required_text(input, "category");
        let image = optional_text(input, "image");

        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        title.report("title", &mut missing, &mut invalid);
        price.report("price", &mut missing, &mut invalid);
        description.report("description", &mut missing, &mut invalid);
        category.report("category", &mut missing, &mut invalid);
        image.report("image", &mut missing, &mut invalid);

        let message = if !missing.is_empty() {
            INCOMPLETE_MESSAGE.to_string()
        } else if invalid.iter().any(|f| f == "price") {
            INVALID_PRICE_MESSAGE.to_string()
        } else {
            format!("Datos inválidos en los campos: {}", invalid.join(", "))
        };

        match (
            title.value(),
            price.value(),
            description.value(),
            category.value(),
            image.value(),
        ) {
            (Some(title), Some(price), Some(description), Some(category), Some(image)) => Ok(Self {
                title,
                price,
                description,
                category,
                image,
            }),
            _ => {
                missing.extend(invalid);
                Err(AppError::validation(message, missing))
            }
        }
    }

    /// Document for a fresh product, with an empty rating.
    pub fn into_document(self) -> Document {
        let mut document = self.into_fields();
        document.insert(
            "rating".to_string(),
            serde_json::json!({ "rate": 0, "count": 0 }),
        );
        document
    }

    /// Caller-owned fields only; used when replacing an existing product.
    pub fn into_fields(self) -> Document {
        let mut document = Document::new();
        document.insert("title".to_string(), Value::String(self.title));
        document.insert("price".to_string(), serde_json::json!(self.price));
        document.insert("description".to_string(), Value::String(self.description));
        document.insert("category".to_string(), Value::String(self.category));
        document.insert("image".to_string(), Value::String(self.image));
        document
    }
}
