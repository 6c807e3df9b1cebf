//! Conversions between [`Value`] and PostgreSQL wire types.

use crate::error::{Error, ExecResult};
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error as StdError;
use std::sync::Arc;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type};
use uuid::Uuid;

/// Binds a [`Value`], converting to whatever the server inferred for the parameter.
#[derive(Debug)]
pub(crate) struct PgValue<'a>(pub(crate) &'a Value);

type BoxError = Box<dyn StdError + Sync + Send>;

impl ToSql for PgValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR => i.to_string().to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::UUID => Uuid::parse_str(s)?.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
                _ => s.as_str().to_sql(ty, out),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMPTZ => DateTime::<Utc>::from_naive_utc_and_offset(*ts, Utc).to_sql(ty, out),
                Type::DATE => ts.date().to_sql(ty, out),
                _ => ts.to_sql(ty, out),
            },
            Value::Uuid(u) => u.to_sql(ty, out),
            Value::List(items) => match ty.kind() {
                Kind::Array(_) => items.iter().map(PgValue).collect::<Vec<_>>().to_sql(ty, out),
                _ => to_json(self.0).to_sql(ty, out),
            },
            Value::Map(_) => to_json(self.0).to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Text(s) => Json::String(s.clone()),
        Value::Timestamp(ts) => Json::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(fields) => Json::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

/// Decode a driver row column by column according to the column types.
pub(crate) fn decode_row(row: &tokio_postgres::Row, columns: &Arc<[String]>) -> ExecResult<Row> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| decode_column(row, i, column.type_(), column.name()))
        .collect::<ExecResult<Vec<_>>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}

pub(crate) fn column_names(row: &tokio_postgres::Row) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .into()
}

fn decode_column(row: &tokio_postgres::Row, i: usize, ty: &Type, name: &str) -> ExecResult<Value> {
    fn get<'a, T>(row: &'a tokio_postgres::Row, i: usize, name: &str) -> ExecResult<Value>
    where
        T: tokio_postgres::types::FromSql<'a> + Into<Value>,
    {
        row.try_get::<_, Option<T>>(i)
            .map(|v| v.map_or(Value::Null, Into::into))
            .map_err(|e| Error::decode(name, e.to_string()))
    }

    match *ty {
        Type::BOOL => get::<bool>(row, i, name),
        Type::INT2 => get::<i16>(row, i, name),
        Type::INT4 => get::<i32>(row, i, name),
        Type::INT8 => get::<i64>(row, i, name),
        Type::FLOAT4 => get::<f32>(row, i, name),
        Type::FLOAT8 => get::<f64>(row, i, name),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => get::<String>(row, i, name),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, i, name),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, i, name),
        Type::DATE => get::<NaiveDate>(row, i, name),
        Type::UUID => get::<Uuid>(row, i, name),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, i, name),
        _ => Err(Error::decode(
            name,
            format!("unsupported column type {ty}"),
        )),
    }
}
