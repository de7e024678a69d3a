use std::fmt::Display;

pub const LISTINGS: &str = "HA_IMOVEIS";
pub const FAVORITES: &str = "HA_favorito";
pub const USERS: &str = "HA_user";
pub const BROKERS: &str = "HA_corretor";
pub const ANALYSIS_REQUESTS: &str = "HA_solicitacoes";
pub const CONTACTS: &str = "HA_contatos";

/// Row filter in the table REST dialect: `column=op.value`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: &'static str,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn in_list<T: Display>(mut self, column: &str, values: &[T]) -> Self {
        let joined = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.params.push((column.to_string(), format!("in.({joined})")));
        self
    }

    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.params
            .push(("on_conflict".to_string(), columns.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether any row filter is present; unfiltered deletes are refused
    pub fn is_filtered(&self) -> bool {
        self.params
            .iter()
            .any(|(key, _)| key != "select" && key != "on_conflict")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filter_params_in_order() {
        let query = Query::table(FAVORITES)
            .select("imovel_id")
            .eq("user_id", 42)
            .in_list("imovel_id", &[1, 2, 3]);

        assert_eq!(
            query.params(),
            &[
                ("select".to_string(), "imovel_id".to_string()),
                ("user_id".to_string(), "eq.42".to_string()),
                ("imovel_id".to_string(), "in.(1,2,3)".to_string()),
            ]
        );
        assert!(query.is_filtered());
    }

    #[test]
    fn select_only_is_not_a_row_filter() {
        assert!(!Query::table(LISTINGS).select("*").is_filtered());
        assert!(!Query::table(FAVORITES)
            .on_conflict("user_id,imovel_id")
            .is_filtered());
    }
}
