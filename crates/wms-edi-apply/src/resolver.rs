//! External item code resolution.

use wms_edi_store::{NewItemMapping, Store};

use crate::Result;

/// Maps a trading partner's item code to a warehouse item id.
///
/// Resolution order: exact match on the internal item code first, then the
/// learned mapping table (a mapping's `item_id` wins; a mapping that only
/// carries an `item_code` re-enters the direct lookup). A direct match
/// always beats a conflicting mapping for the same external code.
#[derive(Clone)]
pub struct ItemResolver {
    store: Store,
}

impl ItemResolver {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve an external code; `None` means the caller should record the
    /// line as unresolvable and skip it.
    pub async fn resolve(
        &self,
        integration_key: &str,
        external_code: &str,
    ) -> Result<Option<i64>> {
        if let Some(item_id) = self.store.find_item_id_by_code(external_code).await? {
            return Ok(Some(item_id));
        }

        match self
            .store
            .get_item_mapping(integration_key, external_code)
            .await?
        {
            Some(mapping) => {
                if mapping.item_id.is_some() {
                    return Ok(mapping.item_id);
                }
                match mapping.item_code.as_deref() {
                    Some(item_code) => Ok(self.store.find_item_id_by_code(item_code).await?),
                    None => Ok(None),
                }
            }
            None => Ok(None),
        }
    }

    /// Advisory candidates for an external code, for operator confirmation.
    /// Substring match against item code, description and barcode.
    pub async fn suggest(
        &self,
        integration_key: &str,
        external_code: &str,
        limit: usize,
    ) -> Result<Vec<NewItemMapping>> {
        let candidates = self.store.search_items(external_code, limit).await?;
        Ok(candidates
            .into_iter()
            .map(|item| NewItemMapping {
                integration_key: integration_key.to_string(),
                external_code: external_code.to_string(),
                item_id: Some(item.id),
                item_code: Some(item.code),
                description: item.description,
            })
            .collect())
    }

    /// Candidates for every unresolved item code recorded against an inbox
    /// record, up to three per code.
    pub async fn suggest_for_inbox(
        &self,
        integration_key: &str,
        inbox_id: i64,
        limit: usize,
    ) -> Result<Vec<NewItemMapping>> {
        let codes = self
            .store
            .distinct_error_item_codes(inbox_id, limit)
            .await?;

        let mut suggestions = Vec::new();
        for code in codes {
            suggestions.extend(self.suggest(integration_key, &code, 3).await?);
        }
        Ok(suggestions)
    }
}
