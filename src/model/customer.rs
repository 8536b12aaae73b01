use std::fmt::{Display, Formatter};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One row of the `clientes` table, with the column names used on the wire.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Customer {
    #[serde(rename = "ID", default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(rename = "Nome", default)]
    pub nome: Option<String>,
    #[serde(rename = "Idade", default)]
    pub idade: Option<Age>,
    #[serde(rename = "UF", default)]
    pub uf: Option<String>,
}

impl Customer {
    pub fn from_draft(id: i64, draft: CustomerDraft) -> Self {
        Self {
            id: Some(id),
            nome: draft.nome,
            idade: draft.idade,
            uf: draft.uf,
        }
    }

    /// A record may only be edited or deleted when its ID is a strictly positive number.
    pub fn actionable_id(&self) -> Option<i64> {
        self.id.filter(|id| *id > 0)
    }
}

/// Insert/update body. Nothing is required: absent fields are stored as NULL.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CustomerDraft {
    #[serde(
        rename = "Nome",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub nome: Option<String>,
    #[serde(rename = "Idade", default, skip_serializing_if = "Option::is_none")]
    pub idade: Option<Age>,
    #[serde(
        rename = "UF",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub uf: Option<String>,
}

/// What the store reports back for a mutation.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAck {
    pub affected_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<i64>,
}

/// `Idade` arrives as a number or as the text typed into a form.
#[derive(Clone, Debug, PartialEq)]
pub enum Age {
    Number(i64),
    Text(String),
}

impl Display for Age {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for Age {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for Age {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(number) => match integral(&number) {
                Some(n) => Self::Number(n),
                None => Self::Text(number.to_string()),
            },
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        })
    }
}

impl ToSql for Age {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Number(n) => Ok(ToSqlOutput::from(*n)),
            Self::Text(text) => Ok(ToSqlOutput::from(text.as_str())),
        }
    }
}

impl FromSql for Age {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(n) => Ok(Self::Number(n)),
            ValueRef::Real(r) => match whole(r) {
                Some(n) => Ok(Self::Number(n)),
                None => Ok(Self::Text(r.to_string())),
            },
            ValueRef::Text(_) => value.as_str().map(|text| Self::Text(text.to_string())),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

// Floats outside the i64 range would saturate on `as`, so they are not whole numbers here.
fn whole(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

fn integral(number: &serde_json::Number) -> Option<i64> {
    number.as_i64().or_else(|| number.as_f64().and_then(whole))
}

// Text columns take any scalar the client sends; numbers and booleans are stored as their text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

// Anything that is not a number (or numeric text) is treated as an absent ID.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => integral(&number),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    })
}
