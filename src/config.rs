use anyhow::Context;

/// Entry names of the external order form. The endpoint is an opaque
/// form-style service, so the field names are free-form and configured
/// alongside the URL.
#[derive(Debug, Clone)]
pub struct FormFields {
    pub product_details: String,
    pub customer_name: String,
    pub customer_mobile: String,
    pub delivery_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Published spreadsheet URL. Empty or unset disables the sheet source
    /// and the catalog is served from the static fallback file only.
    pub sheet_csv_url: Option<String>,
    pub fallback_path: String,
    pub form_url: Option<String>,
    pub form_fields: FormFields,
    pub storage_dir: String,
    pub static_dir: String,
    pub bind_addr: String,
    pub port: u16,
}

pub fn load_env() -> Result<(), anyhow::Error> {
    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env").context("Unable to create .env file")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }
    Ok(())
}

fn get_opt(key: &str) -> Option<String> {
    let value = envmnt::get_or(key, "");
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            sheet_csv_url: get_opt("SHEET_CSV_URL"),
            fallback_path: envmnt::get_or("CATALOG_FALLBACK_PATH", "products.json"),
            form_url: get_opt("ORDER_FORM_URL"),
            form_fields: FormFields {
                product_details: envmnt::get_or("ORDER_FIELD_DETAILS", "order_details"),
                customer_name: envmnt::get_or("ORDER_FIELD_NAME", "customer_name"),
                customer_mobile: envmnt::get_or("ORDER_FIELD_MOBILE", "customer_mobile"),
                delivery_address: envmnt::get_or("ORDER_FIELD_ADDRESS", "delivery_address"),
            },
            storage_dir: envmnt::get_or("STORAGE_DIR", "storage"),
            static_dir: envmnt::get_or("STATIC_DIR", "static"),
            bind_addr: envmnt::get_or("SELF_ADDR", "0.0.0.0"),
            port: envmnt::get_parse("SELF_PORT").unwrap_or(8080),
        }
    }
}
