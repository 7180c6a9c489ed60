//! SQL Server database provider
//!
//! Concrete implementation using tiberius over a tokio TCP stream, driven
//! by a private current-thread runtime. Named instances are resolved through
//! the SQL Browser service.

use crate::config::ConnectionAttributes;
use crate::db::provider::{Connection, ConnectionProvider, Session, SessionConnection, StatementOutput};
use crate::db::types::{CellValue, ColumnDef, DataType, Dialect, Row};
use crate::error::{ConfigResult, DbError, DbResult};
use tiberius::{AuthMethod, Column, ColumnData, ColumnType, FromSql, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// Default ODBC driver name recorded in connection strings
pub const DEFAULT_DRIVER: &str = "{SQL Server}";

type MssqlClient = tiberius::Client<Compat<TcpStream>>;

/// SQL Server database provider
#[derive(Debug, Clone)]
pub struct SqlServerProvider {
    attributes: ConnectionAttributes,
}

impl SqlServerProvider {
    pub fn new(attributes: ConnectionAttributes) -> Self {
        Self { attributes }
    }

    /// Build a provider from a `key=value;...` connection string
    ///
    /// # Errors
    /// Returns `ConfigError::ConnectionStringRequired` for an empty string
    pub fn from_connection_string(connection_string: &str) -> ConfigResult<Self> {
        let attributes = ConnectionAttributes::from_connection_string(connection_string)?;
        Ok(Self::new(attributes))
    }

    pub fn attributes(&self) -> &ConnectionAttributes {
        &self.attributes
    }

    fn tiberius_config(&self) -> DbResult<tiberius::Config> {
        let attrs = &self.attributes;
        if attrs.trusted_connection {
            return Err(DbError::ConnectionFailed(
                "trusted connections need integrated authentication, \
                 which this build does not include; supply a username and password"
                    .to_string(),
            ));
        }

        let mut config = tiberius::Config::new();
        config.host(&attrs.server);
        if let Some(port) = attrs.port {
            config.port(port);
        }
        if !attrs.instance.is_empty() {
            config.instance_name(&attrs.instance);
        }
        config.database(&attrs.database);
        config.application_name("sqlhelpers");
        config.authentication(AuthMethod::sql_server(
            &attrs.username,
            attrs.password().unwrap_or_default(),
        ));
        if attrs
            .extra("trustservercertificate")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "yes" | "true"))
        {
            config.trust_cert();
        }
        Ok(config)
    }
}

impl ConnectionProvider for SqlServerProvider {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn connect(&self) -> DbResult<Box<dyn Connection>> {
        debug!("attempting to connect to {}", self.describe());
        let config = self.tiberius_config()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let has_instance = !self.attributes.instance.is_empty();
        let client = runtime
            .block_on(async {
                let tcp = if has_instance {
                    TcpStream::connect_named(&config).await?
                } else {
                    TcpStream::connect(config.get_addr()).await?
                };
                tcp.set_nodelay(true)?;
                tiberius::Client::connect(config, tcp.compat_write()).await
            })
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!("connection successful");
        Ok(Box::new(SessionConnection::new(MssqlSession { runtime, client })))
    }

    fn describe(&self) -> String {
        let attrs = &self.attributes;
        let server = if attrs.instance.is_empty() {
            attrs.server.clone()
        } else {
            format!("{}\\{}", attrs.server, attrs.instance)
        };
        format!("sqlserver://{}/{}", server, attrs.database)
    }
}

struct MssqlSession {
    runtime: Runtime,
    client: MssqlClient,
}

impl Session for MssqlSession {
    fn run(&mut self, sql: &str) -> DbResult<StatementOutput> {
        let Self { runtime, client } = self;
        // Metadata is read before the rows so an empty result still describes its columns.
        let (columns, rows) = runtime
            .block_on(async {
                let mut stream = client.simple_query(sql).await?;
                let columns = stream.columns().await?.map(column_defs);
                let rows = stream.into_first_result().await?;
                Ok::<_, tiberius::error::Error>((columns, rows))
            })
            .map_err(|e| DbError::QueryFailed(e.to_string()))?;

        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|data| cell_from_column_data(&data)).collect())
            .collect();

        Ok(StatementOutput { columns, rows })
    }

    // The server runs in autocommit mode unless a transaction was opened.
    fn commit(&mut self) -> DbResult<()> {
        let Self { runtime, client } = self;
        runtime
            .block_on(async {
                client
                    .simple_query("IF @@TRANCOUNT > 0 COMMIT TRANSACTION")
                    .await?
                    .into_results()
                    .await
            })
            .map(|_| ())
            .map_err(|e| DbError::QueryFailed(e.to_string()))
    }

    fn close(self) -> DbResult<()> {
        let Self { runtime, client } = self;
        runtime
            .block_on(client.close())
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))
    }
}

fn column_defs(columns: &[Column]) -> Vec<ColumnDef> {
    columns
        .iter()
        .map(|col| ColumnDef::new(col.name(), mssql_type_to_datatype(col.column_type())))
        .collect()
}

fn mssql_type_to_datatype(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Int1 | ColumnType::Int2 => DataType::SmallInt,
        ColumnType::Int4 | ColumnType::Intn => DataType::Integer,
        ColumnType::Int8 => DataType::BigInt,
        ColumnType::Float4 => DataType::Real,
        ColumnType::Float8 | ColumnType::Floatn => DataType::Double,
        ColumnType::Decimaln | ColumnType::Numericn | ColumnType::Money | ColumnType::Money4 => {
            DataType::Numeric
        }
        ColumnType::Bit | ColumnType::Bitn => DataType::Boolean,
        ColumnType::BigVarChar | ColumnType::NVarchar | ColumnType::Text | ColumnType::NText => {
            DataType::Varchar(None)
        }
        ColumnType::BigChar | ColumnType::NChar => DataType::Char(None),
        ColumnType::Guid => DataType::Uuid,
        ColumnType::Daten => DataType::Date,
        ColumnType::Timen => DataType::Time,
        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2 => DataType::Timestamp,
        ColumnType::DatetimeOffsetn => DataType::TimestampTz,
        ColumnType::BigBinary | ColumnType::BigVarBin | ColumnType::Image => DataType::Bytea,
        other => DataType::Unknown(format!("{:?}", other)),
    }
}

fn cell_from_column_data(data: &ColumnData<'static>) -> CellValue {
    fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> CellValue) -> CellValue {
        value.map_or(CellValue::Null, f)
    }

    match data {
        ColumnData::U8(v) => or_null(*v, |n| CellValue::Integer(n.into())),
        ColumnData::I16(v) => or_null(*v, |n| CellValue::Integer(n.into())),
        ColumnData::I32(v) => or_null(*v, |n| CellValue::Integer(n.into())),
        ColumnData::I64(v) => or_null(*v, CellValue::Integer),
        ColumnData::F32(v) => or_null(*v, |n| CellValue::Float(n.into())),
        ColumnData::F64(v) => or_null(*v, CellValue::Float),
        ColumnData::Bit(v) => or_null(*v, CellValue::Boolean),
        ColumnData::String(v) => or_null(v.as_ref(), |s| CellValue::Text(s.to_string())),
        ColumnData::Guid(v) => or_null(*v, |u| CellValue::Uuid(u.to_string())),
        ColumnData::Binary(v) => or_null(v.as_ref(), |b| CellValue::Binary(b.to_vec())),
        ColumnData::Numeric(v) => or_null(v.as_ref(), |n| CellValue::Text(n.to_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            temporal::<chrono::NaiveDateTime>(data)
        }
        ColumnData::Date(_) => temporal::<chrono::NaiveDate>(data),
        ColumnData::Time(_) => temporal::<chrono::NaiveTime>(data),
        ColumnData::DateTimeOffset(_) => temporal::<chrono::DateTime<chrono::FixedOffset>>(data),
        other => CellValue::Text(format!("{:?}", other)),
    }
}

fn temporal<'a, T>(data: &'a ColumnData<'static>) -> CellValue
where
    T: FromSql<'a> + ToString,
{
    match T::from_sql(data) {
        Ok(Some(v)) => CellValue::DateTime(v.to_string()),
        Ok(None) => CellValue::Null,
        Err(e) => CellValue::Text(format!("<unable to display: {}>", e)),
    }
}
