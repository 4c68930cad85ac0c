// src/services/assembler.rs

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::order::CartLinePayload,
    services::inventory::InventoryService,
};

// Uma linha do carrinho já resolvida e precificada: snapshot de nome e
// preço vindos do catálogo (nunca do cliente) e a lista de débitos de
// estoque que a linha vai causar no commit.
#[derive(Debug, Clone)]
pub struct AssembledLine {
    pub product_id: Option<i64>,
    pub name_snapshot: String,
    pub unit_price: i64,
    pub qty: i64,
    pub line_total: i64,
    // (product_id, quantidade) — para linha de produto é a própria
    // linha; para combo são os componentes multiplicados pela
    // quantidade pedida.
    pub decrements: Vec<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub lines: Vec<AssembledLine>,
    pub total_amount: i64,
}

// Agrega os débitos de todas as linhas por produto, em ordem
// determinística de id. Duas linhas que tocam o mesmo produto viram um
// débito só, então o UPDATE condicional avalia o total de uma vez.
pub fn merge_decrements(lines: &[AssembledLine]) -> Vec<(i64, i64)> {
    let mut merged: BTreeMap<i64, i64> = BTreeMap::new();
    for line in lines {
        for (product_id, qty) in &line.decrements {
            *merged.entry(*product_id).or_insert(0) += qty;
        }
    }
    merged.into_iter().collect()
}

// O montador de pedidos: transforma o carrinho em linhas precificadas e
// validadas. Só lê — a baixa de estoque acontece na transação de commit
// do OrderService, que reconfere o saldo atomicamente.
#[derive(Clone)]
pub struct OrderAssembler {
    pool: SqlitePool,
    catalog_repo: CatalogRepository,
    inventory: InventoryService,
}

impl OrderAssembler {
    pub fn new(pool: SqlitePool, catalog_repo: CatalogRepository, inventory: InventoryService) -> Self {
        Self {
            pool,
            catalog_repo,
            inventory,
        }
    }

    // Qualquer linha inválida aborta a montagem inteira; pedido parcial
    // não existe.
    pub async fn assemble(&self, cart: &[CartLinePayload]) -> Result<AssembledOrder, AppError> {
        if cart.is_empty() {
            return Err(AppError::InvalidCartLine("o carrinho está vazio".into()));
        }

        let mut lines = Vec::with_capacity(cart.len());
        let mut total_amount: i64 = 0;

        for line in cart {
            if line.qty < 1 {
                return Err(AppError::InvalidCartLine(
                    "a quantidade deve ser no mínimo 1".into(),
                ));
            }

            let assembled = match (line.product_id, line.pack_variant_id) {
                (Some(product_id), None) => self.assemble_product_line(product_id, line.qty).await?,
                (None, Some(variant_id)) => self.assemble_pack_line(variant_id, line.qty).await?,
                _ => {
                    return Err(AppError::InvalidCartLine(
                        "informe productId ou packVariantId, nunca ambos".into(),
                    ));
                }
            };

            total_amount += assembled.line_total;
            lines.push(assembled);
        }

        Ok(AssembledOrder {
            lines,
            total_amount,
        })
    }

    async fn assemble_product_line(
        &self,
        product_id: i64,
        qty: i64,
    ) -> Result<AssembledLine, AppError> {
        let product = self
            .catalog_repo
            .find_active_product(&self.pool, product_id)
            .await?
            .ok_or(AppError::ProductNotFound(product_id))?;

        if !self.inventory.check_stock(&self.pool, product.id, qty).await? {
            return Err(AppError::InsufficientStock(product.name));
        }

        Ok(AssembledLine {
            product_id: Some(product.id),
            name_snapshot: product.name,
            unit_price: product.price,
            qty,
            line_total: product.price * qty,
            decrements: vec![(product.id, qty)],
        })
    }

    async fn assemble_pack_line(
        &self,
        variant_id: i64,
        qty: i64,
    ) -> Result<AssembledLine, AppError> {
        let detail = self
            .catalog_repo
            .get_pack_variant(variant_id)
            .await?
            .ok_or(AppError::PackVariantNotFound(variant_id))?;

        // A quantidade do combo multiplica a de cada componente.
        let mut decrements = Vec::with_capacity(detail.items.len());
        for item in &detail.items {
            let needed = item.qty * qty;
            if !self
                .inventory
                .check_stock(&self.pool, item.product_id, needed)
                .await?
            {
                let name = self
                    .catalog_repo
                    .find_product(&self.pool, item.product_id)
                    .await?
                    .map(|p| p.name)
                    .unwrap_or_else(|| format!("produto {}", item.product_id));
                return Err(AppError::InsufficientStock(name));
            }
            decrements.push((item.product_id, needed));
        }

        // Preço fechado da variante, não a soma dos componentes.
        let unit_price = detail.variant.price;

        Ok(AssembledLine {
            product_id: None,
            name_snapshot: format!("{} - {}", detail.pack_name, detail.variant.name),
            unit_price,
            qty,
            line_total: unit_price * qty,
            decrements,
        })
    }
}
