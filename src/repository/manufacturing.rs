use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::manufacturing::{
    BillOfMaterials, BomDetail, BomItem, NewBillOfMaterials, NewWorkOrder, ProductionSummary,
    WorkOrder, WorkOrderStatus, work_order_number,
};
use crate::domain::stats::LabelCount;
use crate::domain::types::{BomId, CompanyId, WorkOrderId};
use crate::models::manufacturing::{
    BillOfMaterials as DbBillOfMaterials, BomItem as DbBomItem,
    NewBillOfMaterials as DbNewBillOfMaterials, NewBomItem as DbNewBomItem,
    NewWorkOrder as DbNewWorkOrder, ProductionTotalsRow, WorkOrder as DbWorkOrder,
};
use crate::models::stats::{CountRow, LabelCountRow};
use crate::query::{DateRange, Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    DieselRepository, ManufacturingReader, ManufacturingWriter, WorkOrderListQuery,
};

fn load_items(conn: &mut SqliteConnection, bom_id: i32) -> RepositoryResult<Vec<BomItem>> {
    use crate::schema::bom_items;

    bom_items::table
        .filter(bom_items::bom_id.eq(bom_id))
        .order(bom_items::id.asc())
        .load::<DbBomItem>(conn)?
        .into_iter()
        .map(|item| BomItem::try_from(item).map_err(RepositoryError::from))
        .collect()
}

impl ManufacturingReader for DieselRepository {
    fn list_work_orders(
        &self,
        query: WorkOrderListQuery,
    ) -> RepositoryResult<(usize, Vec<WorkOrder>)> {
        use crate::schema::work_orders;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = work_orders::table
                .filter(work_orders::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(work_orders::status.eq(status.as_str()));
            }
            if let Some(start) = query.range.start() {
                items = items.filter(work_orders::created_at.ge(start));
            }
            if let Some(end) = query.range.end_exclusive() {
                items = items.filter(work_orders::created_at.lt(end));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                let pattern = format!("%{term}%");
                items = items.filter(
                    work_orders::order_number
                        .like(pattern.clone())
                        .or(work_orders::product_name.like(pattern)),
                );
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let rows = query_builder()
            .order((work_orders::created_at.desc(), work_orders::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbWorkOrder>(&mut conn)?;

        let orders = rows
            .into_iter()
            .map(|o| WorkOrder::try_from(o).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, orders))
    }

    fn get_work_order(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<WorkOrder>> {
        use crate::schema::work_orders;

        let mut conn = self.conn()?;
        let order = work_orders::table
            .filter(work_orders::id.eq(id.get()))
            .filter(work_orders::company_id.eq(company_id.get()))
            .first::<DbWorkOrder>(&mut conn)
            .optional()?;

        order.map(WorkOrder::try_from).transpose().map_err(Into::into)
    }

    fn work_order_counts_by_status(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<LabelCount>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .query(
                "SELECT status AS label, COUNT(*) AS count FROM work_orders",
                " GROUP BY status ORDER BY count DESC, label",
            )
            .load::<LabelCountRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn production_summary(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<ProductionSummary> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .date_range("created_at", range)
            .and_raw("status <> 'cancelled'")
            .query(
                "SELECT COALESCE(SUM(quantity), 0) AS planned, \
                 COALESCE(SUM(completed_quantity), 0) AS completed, \
                 COALESCE(SUM(scrap_quantity), 0) AS scrapped \
                 FROM work_orders",
                "",
            )
            .get_result::<ProductionTotalsRow>(&mut conn)?;

        Ok(row.into())
    }

    fn count_overdue_work_orders(
        &self,
        company_id: CompanyId,
        today: NaiveDate,
    ) -> RepositoryResult<i64> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("due_date", Op::Lt, today)
            .and_raw("status NOT IN ('completed', 'cancelled')")
            .query("SELECT COUNT(*) AS count FROM work_orders", "")
            .get_result::<CountRow>(&mut conn)?;

        Ok(row.count)
    }

    fn list_boms(&self, company_id: CompanyId) -> RepositoryResult<Vec<BillOfMaterials>> {
        use crate::schema::bills_of_materials;

        let mut conn = self.conn()?;
        bills_of_materials::table
            .filter(bills_of_materials::company_id.eq(company_id.get()))
            .order((
                bills_of_materials::product_name.asc(),
                bills_of_materials::version.asc(),
            ))
            .load::<DbBillOfMaterials>(&mut conn)?
            .into_iter()
            .map(|b| BillOfMaterials::try_from(b).map_err(RepositoryError::from))
            .collect()
    }

    fn get_bom(&self, id: BomId, company_id: CompanyId) -> RepositoryResult<Option<BomDetail>> {
        use crate::schema::bills_of_materials;

        let mut conn = self.conn()?;
        let Some(bom) = bills_of_materials::table
            .filter(bills_of_materials::id.eq(id.get()))
            .filter(bills_of_materials::company_id.eq(company_id.get()))
            .first::<DbBillOfMaterials>(&mut conn)
            .optional()?
        else {
            return Ok(None);
        };

        let items = load_items(&mut conn, bom.id)?;
        Ok(Some(BomDetail::new(BillOfMaterials::try_from(bom)?, items)))
    }
}

impl ManufacturingWriter for DieselRepository {
    fn create_work_order(&self, order: &NewWorkOrder) -> RepositoryResult<WorkOrder> {
        use crate::schema::work_orders;

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let insertable: DbNewWorkOrder = order.into();
            let created = diesel::insert_into(work_orders::table)
                .values(&insertable)
                .get_result::<DbWorkOrder>(conn)?;

            let number = work_order_number(
                created.created_at.date(),
                WorkOrderId::new(created.id)?,
            );
            let numbered = diesel::update(work_orders::table.find(created.id))
                .set(work_orders::order_number.eq(number))
                .get_result::<DbWorkOrder>(conn)?;

            Ok(WorkOrder::try_from(numbered)?)
        })
    }

    fn record_work_order_production(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
        completed: i32,
        scrapped: i32,
    ) -> RepositoryResult<WorkOrder> {
        use crate::schema::work_orders;

        let mut conn = self.conn()?;
        conn.immediate_transaction::<_, RepositoryError, _>(|conn| {
            let current = work_orders::table
                .filter(work_orders::id.eq(id.get()))
                .filter(work_orders::company_id.eq(company_id.get()))
                .first::<DbWorkOrder>(conn)
                .optional()?
                .ok_or(RepositoryError::NotFound)?;
            let current = WorkOrder::try_from(current)?;

            let update = current
                .apply_production(completed, scrapped)
                .map_err(RepositoryError::Conflict)?;

            let updated = diesel::update(
                work_orders::table
                    .filter(work_orders::id.eq(id.get()))
                    .filter(work_orders::status.eq(current.status.as_str())),
            )
            .set((
                work_orders::completed_quantity.eq(work_orders::completed_quantity + completed),
                work_orders::scrap_quantity.eq(work_orders::scrap_quantity + scrapped),
                work_orders::status.eq(update.status.as_str()),
            ))
            .get_result::<DbWorkOrder>(conn)
            .optional()?
            .ok_or_else(|| RepositoryError::Conflict("work order changed concurrently".into()))?;

            Ok(WorkOrder::try_from(updated)?)
        })
    }

    fn update_work_order_status(
        &self,
        id: WorkOrderId,
        company_id: CompanyId,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    ) -> RepositoryResult<WorkOrder> {
        use crate::schema::work_orders;

        let mut conn = self.conn()?;
        let updated = diesel::update(
            work_orders::table
                .filter(work_orders::id.eq(id.get()))
                .filter(work_orders::company_id.eq(company_id.get()))
                .filter(work_orders::status.eq(from.as_str())),
        )
        .set(work_orders::status.eq(to.as_str()))
        .get_result::<DbWorkOrder>(&mut conn)
        .optional()?
        .ok_or_else(|| RepositoryError::Conflict(format!("work order is no longer {from}")))?;

        Ok(WorkOrder::try_from(updated)?)
    }

    fn create_bom(&self, bom: &NewBillOfMaterials) -> RepositoryResult<BomDetail> {
        use crate::schema::{bills_of_materials, bom_items};

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let created = diesel::insert_into(bills_of_materials::table)
                .values(&DbNewBillOfMaterials {
                    company_id: bom.company_id.get(),
                    product_name: bom.product_name.as_str(),
                    version: bom.version.as_str(),
                })
                .get_result::<DbBillOfMaterials>(conn)?;

            let items = bom
                .items
                .iter()
                .map(|item| DbNewBomItem {
                    bom_id: created.id,
                    component_name: item.component_name.as_str(),
                    quantity: item.quantity,
                    unit_cost: item.unit_cost,
                })
                .collect::<Vec<_>>();
            diesel::insert_into(bom_items::table)
                .values(&items)
                .execute(conn)?;

            let items = load_items(conn, created.id)?;
            Ok(BomDetail::new(BillOfMaterials::try_from(created)?, items))
        })
    }
}
