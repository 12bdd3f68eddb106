use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::domain::procurement::{
    DeliveryStats, NewPurchaseOrder, NewVendor, PurchaseOrder, PurchaseOrderDetail,
    PurchaseOrderItem, PurchaseOrderStatus, SpendByStatus, Vendor, VendorOrderStats,
    VendorStatus, purchase_order_number,
};
use crate::domain::stats::LabelValue;
use crate::domain::types::{CompanyId, PurchaseOrderId, VendorId};
use crate::models::procurement::{
    DeliveryStatsRow, NewPurchaseOrder as DbNewPurchaseOrder,
    NewPurchaseOrderItem as DbNewPurchaseOrderItem, NewVendor as DbNewVendor,
    PurchaseOrder as DbPurchaseOrder, PurchaseOrderItem as DbPurchaseOrderItem,
    SpendByStatusRow, Vendor as DbVendor, VendorOrderStatsRow,
};
use crate::models::stats::LabelValueRow;
use crate::query::{DateRange, Op, WhereClause};
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::repository::{
    DieselRepository, ProcurementReader, ProcurementWriter, PurchaseOrderListQuery,
};

fn load_detail(
    conn: &mut SqliteConnection,
    order: DbPurchaseOrder,
) -> RepositoryResult<PurchaseOrderDetail> {
    use crate::schema::{purchase_order_items, vendors};

    let vendor_name = vendors::table
        .find(order.vendor_id)
        .select(vendors::name)
        .first::<String>(conn)?;

    let items = purchase_order_items::table
        .filter(purchase_order_items::purchase_order_id.eq(order.id))
        .order(purchase_order_items::id.asc())
        .load::<DbPurchaseOrderItem>(conn)?
        .into_iter()
        .map(|item| PurchaseOrderItem::try_from(item).map_err(RepositoryError::from))
        .collect::<RepositoryResult<Vec<_>>>()?;

    Ok(PurchaseOrderDetail {
        order: PurchaseOrder::try_from(order)?,
        vendor_name,
        items,
    })
}

impl ProcurementReader for DieselRepository {
    fn list_purchase_orders(
        &self,
        query: PurchaseOrderListQuery,
    ) -> RepositoryResult<(usize, Vec<PurchaseOrder>)> {
        use crate::schema::purchase_orders;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = purchase_orders::table
                .filter(purchase_orders::company_id.eq(query.company_id.get()))
                .into_boxed::<Sqlite>();

            if let Some(status) = query.status {
                items = items.filter(purchase_orders::status.eq(status.as_str()));
            }
            if let Some(vendor_id) = query.vendor_id {
                items = items.filter(purchase_orders::vendor_id.eq(vendor_id.get()));
            }
            if let Some(from) = query.range.from {
                items = items.filter(purchase_orders::order_date.ge(from));
            }
            if let Some(to) = query.range.to {
                items = items.filter(purchase_orders::order_date.le(to));
            }
            if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                items = items.filter(purchase_orders::po_number.like(format!("%{term}%")));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let orders = query_builder()
            .order((purchase_orders::order_date.desc(), purchase_orders::id.desc()))
            .offset(query.pagination.offset())
            .limit(query.pagination.limit())
            .load::<DbPurchaseOrder>(&mut conn)?
            .into_iter()
            .map(|o| PurchaseOrder::try_from(o).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, orders))
    }

    fn get_purchase_order(
        &self,
        id: PurchaseOrderId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<PurchaseOrderDetail>> {
        use crate::schema::purchase_orders;

        let mut conn = self.conn()?;
        let order = purchase_orders::table
            .filter(purchase_orders::id.eq(id.get()))
            .filter(purchase_orders::company_id.eq(company_id.get()))
            .first::<DbPurchaseOrder>(&mut conn)
            .optional()?;

        order.map(|o| load_detail(&mut conn, o)).transpose()
    }

    fn list_vendors(
        &self,
        company_id: CompanyId,
        search: Option<&str>,
    ) -> RepositoryResult<Vec<Vendor>> {
        use crate::schema::vendors;

        let mut conn = self.conn()?;
        let mut query = vendors::table
            .filter(vendors::company_id.eq(company_id.get()))
            .into_boxed::<Sqlite>();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            query = query.filter(
                vendors::name
                    .like(pattern.clone())
                    .or(vendors::email.like(pattern)),
            );
        }

        query
            .order(vendors::name.asc())
            .load::<DbVendor>(&mut conn)?
            .into_iter()
            .map(|v| Vendor::try_from(v).map_err(RepositoryError::from))
            .collect()
    }

    fn get_vendor(
        &self,
        id: VendorId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Vendor>> {
        use crate::schema::vendors;

        let mut conn = self.conn()?;
        let vendor = vendors::table
            .filter(vendors::id.eq(id.get()))
            .filter(vendors::company_id.eq(company_id.get()))
            .first::<DbVendor>(&mut conn)
            .optional()?;

        vendor.map(Vendor::try_from).transpose().map_err(Into::into)
    }

    fn spend_by_status(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<Vec<SpendByStatus>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("company_id", company_id)
            .day_range("order_date", range)
            .query(
                "SELECT status, COUNT(*) AS orders, \
                 COALESCE(SUM(total_amount), 0.0) AS spend FROM purchase_orders",
                " GROUP BY status ORDER BY status",
            )
            .load::<SpendByStatusRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn count_active_vendors(&self, company_id: CompanyId) -> RepositoryResult<i64> {
        use crate::schema::vendors;

        let mut conn = self.conn()?;
        let count = vendors::table
            .filter(vendors::company_id.eq(company_id.get()))
            .filter(vendors::status.eq(VendorStatus::Active.as_str()))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count)
    }

    fn delivery_stats(
        &self,
        company_id: CompanyId,
        range: &DateRange,
    ) -> RepositoryResult<DeliveryStats> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .day_range("order_date", range)
            .and_raw("status = 'received'")
            .query(
                "SELECT COUNT(*) AS received, \
                 COALESCE(SUM(CASE WHEN expected_date IS NULL OR received_date <= expected_date \
                 THEN 1 ELSE 0 END), 0) AS on_time FROM purchase_orders",
                "",
            )
            .get_result::<DeliveryStatsRow>(&mut conn)?;

        Ok(row.into())
    }

    fn top_vendors_by_spend(
        &self,
        company_id: CompanyId,
        range: &DateRange,
        limit: i64,
    ) -> RepositoryResult<Vec<LabelValue>> {
        let mut conn = self.conn()?;
        let rows = WhereClause::scoped("po.company_id", company_id)
            .day_range("po.order_date", range)
            .and_raw("po.status <> 'cancelled'")
            .query(
                "SELECT v.name AS label, SUM(po.total_amount) AS value \
                 FROM purchase_orders po JOIN vendors v ON v.id = po.vendor_id",
                &format!(" GROUP BY v.id, v.name ORDER BY value DESC LIMIT {limit}"),
            )
            .load::<LabelValueRow>(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn vendor_order_stats(
        &self,
        vendor_id: VendorId,
        company_id: CompanyId,
    ) -> RepositoryResult<VendorOrderStats> {
        let mut conn = self.conn()?;
        let row = WhereClause::scoped("company_id", company_id)
            .and("vendor_id", Op::Eq, vendor_id.get())
            .query(
                "SELECT COUNT(*) AS orders, \
                 COALESCE(SUM(CASE WHEN status <> 'cancelled' THEN total_amount ELSE 0.0 END), 0.0) \
                 AS total_spend, \
                 COALESCE(SUM(CASE WHEN status = 'received' THEN 1 ELSE 0 END), 0) AS received, \
                 COALESCE(SUM(CASE WHEN status = 'received' AND (expected_date IS NULL \
                 OR received_date <= expected_date) THEN 1 ELSE 0 END), 0) AS on_time, \
                 AVG(CASE WHEN status = 'received' \
                 THEN julianday(received_date) - julianday(order_date) END) AS avg_lead_time_days \
                 FROM purchase_orders",
                "",
            )
            .get_result::<VendorOrderStatsRow>(&mut conn)?;

        Ok(row.into())
    }
}

impl ProcurementWriter for DieselRepository {
    fn create_vendor(&self, vendor: &NewVendor) -> RepositoryResult<Vendor> {
        use crate::schema::vendors;

        let mut conn = self.conn()?;
        let insertable: DbNewVendor = vendor.into();
        let created = diesel::insert_into(vendors::table)
            .values(&insertable)
            .get_result::<DbVendor>(&mut conn)?;

        Ok(Vendor::try_from(created)?)
    }

    fn create_purchase_order(
        &self,
        order: &NewPurchaseOrder,
    ) -> RepositoryResult<PurchaseOrderDetail> {
        use crate::schema::{purchase_order_items, purchase_orders};

        let mut conn = self.conn()?;
        conn.transaction::<_, RepositoryError, _>(|conn| {
            let created = diesel::insert_into(purchase_orders::table)
                .values(&DbNewPurchaseOrder {
                    company_id: order.company_id.get(),
                    vendor_id: order.vendor_id.get(),
                    total_amount: order.total_amount(),
                    order_date: order.order_date,
                    expected_date: order.expected_date,
                })
                .get_result::<DbPurchaseOrder>(conn)?;

            let number = purchase_order_number(created.order_date, PurchaseOrderId::new(created.id)?);
            let numbered = diesel::update(purchase_orders::table.find(created.id))
                .set(purchase_orders::po_number.eq(number))
                .get_result::<DbPurchaseOrder>(conn)?;

            let lines = order
                .items
                .iter()
                .map(|item| DbNewPurchaseOrderItem {
                    purchase_order_id: created.id,
                    description: item.description.as_str(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect::<Vec<_>>();
            diesel::insert_into(purchase_order_items::table)
                .values(&lines)
                .execute(conn)?;

            load_detail(conn, numbered)
        })
    }

    fn update_purchase_order_status(
        &self,
        id: PurchaseOrderId,
        company_id: CompanyId,
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
        received_date: Option<NaiveDate>,
    ) -> RepositoryResult<PurchaseOrder> {
        use crate::schema::purchase_orders;

        let mut conn = self.conn()?;
        let target = purchase_orders::table
            .filter(purchase_orders::id.eq(id.get()))
            .filter(purchase_orders::company_id.eq(company_id.get()))
            .filter(purchase_orders::status.eq(from.as_str()));

        let updated = match received_date {
            Some(date) => diesel::update(target)
                .set((
                    purchase_orders::status.eq(to.as_str()),
                    purchase_orders::received_date.eq(date),
                ))
                .get_result::<DbPurchaseOrder>(&mut conn)
                .optional()?,
            None => diesel::update(target)
                .set(purchase_orders::status.eq(to.as_str()))
                .get_result::<DbPurchaseOrder>(&mut conn)
                .optional()?,
        };
        let updated = updated.ok_or_else(|| {
            RepositoryError::Conflict(format!("purchase order is no longer {from}"))
        })?;

        Ok(PurchaseOrder::try_from(updated)?)
    }
}
