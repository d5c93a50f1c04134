//! Static company metadata.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyInfo {
    pub instrument: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub exchange: Option<String>,
}

impl CompanyInfo {
    pub fn lines(&self) -> Vec<String> {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "n/a".to_string());
        vec![
            format!("Information for {}:", self.instrument),
            format!("Company Name: {}", field(&self.name)),
            format!("Sector: {}", field(&self.sector)),
            format!("Industry: {}", field(&self.industry)),
            format!("Country: {}", field(&self.country)),
            format!("Exchange: {}", field(&self.exchange)),
        ]
    }
}
