use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_master_data_tables::Migration),
            Box::new(m20240101_000002_create_transaction_tables::Migration),
            Box::new(m20240101_000003_create_auth_tables::Migration),
            Box::new(m20240101_000004_create_audit_tables::Migration),
            Box::new(m20240101_000005_create_inventory_views::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_master_data_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Single-column lookup tables first
            manager
                .create_table(
                    Table::create()
                        .table(Registrant::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Registrant::Registrant)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductType::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductType::ProductType)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CaseType::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CaseType::PackageType)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UnitsOfUnits::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(UnitsOfUnits::UnitsOfUnits)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Product::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Product::ProductName)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Product::Registrant).string().not_null())
                        .col(ColumnDef::new(Product::ProductType).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_registrant")
                                .from(Product::Table, Product::Registrant)
                                .to(Registrant::Table, Registrant::Registrant),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_product_type")
                                .from(Product::Table, Product::ProductType)
                                .to(ProductType::Table, ProductType::ProductType),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PackSize::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PackSize::PackSize)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PackSize::Id)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PackSize::UnitsPerEach)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PackSize::VolumePerUnit)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PackSize::UnitsOfUnits).string().not_null())
                        .col(ColumnDef::new(PackSize::PackageType).string().not_null())
                        .col(ColumnDef::new(PackSize::UomPerEach).decimal_len(19, 4).null())
                        .col(ColumnDef::new(PackSize::EachesPerPallet).integer().null())
                        .col(ColumnDef::new(PackSize::PalletsPerTl).integer().null())
                        .col(ColumnDef::new(PackSize::EachesPerTl).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pack_size_units_of_units")
                                .from(PackSize::Table, PackSize::UnitsOfUnits)
                                .to(UnitsOfUnits::Table, UnitsOfUnits::UnitsOfUnits),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pack_size_package_type")
                                .from(PackSize::Table, PackSize::PackageType)
                                .to(CaseType::Table, CaseType::PackageType),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Item::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Item::ItemName)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Item::ProductName).string().not_null())
                        .col(ColumnDef::new(Item::PackSize).string().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_product")
                                .from(Item::Table, Item::ProductName)
                                .to(Product::Table, Product::ProductName),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_item_pack_size")
                                .from(Item::Table, Item::PackSize)
                                .to(PackSize::Table, PackSize::PackSize),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Warehouse::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouse::CommonName)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouse::LocationId).string().null())
                        .col(ColumnDef::new(Warehouse::EstablishmentName).string().null())
                        .col(ColumnDef::new(Warehouse::Epa).string().null())
                        .col(ColumnDef::new(Warehouse::Abbreviation).string().null())
                        .col(ColumnDef::new(Warehouse::Street).string().null())
                        .col(ColumnDef::new(Warehouse::City).string().null())
                        .col(ColumnDef::new(Warehouse::State).string().null())
                        .col(ColumnDef::new(Warehouse::Zip).string().null())
                        .col(ColumnDef::new(Warehouse::Phone).string().null())
                        .col(ColumnDef::new(Warehouse::ContactName).string().null())
                        .col(ColumnDef::new(Warehouse::LocationHours).string().null())
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Warehouse::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Item::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PackSize::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Product::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UnitsOfUnits::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CaseType::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductType::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Registrant::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Registrant {
        Table,
        Registrant,
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductType {
        Table,
        ProductType,
    }

    #[derive(DeriveIden)]
    pub(super) enum CaseType {
        Table,
        PackageType,
    }

    #[derive(DeriveIden)]
    pub(super) enum UnitsOfUnits {
        Table,
        UnitsOfUnits,
    }

    #[derive(DeriveIden)]
    pub(super) enum Product {
        Table,
        ProductName,
        Registrant,
        ProductType,
    }

    #[derive(DeriveIden)]
    pub(super) enum PackSize {
        Table,
        PackSize,
        Id,
        UnitsPerEach,
        VolumePerUnit,
        UnitsOfUnits,
        PackageType,
        UomPerEach,
        EachesPerPallet,
        PalletsPerTl,
        EachesPerTl,
    }

    #[derive(DeriveIden)]
    pub(super) enum Item {
        Table,
        ItemName,
        ProductName,
        PackSize,
    }

    #[derive(DeriveIden)]
    pub(super) enum Warehouse {
        Table,
        CommonName,
        LocationId,
        EstablishmentName,
        Epa,
        Abbreviation,
        Street,
        City,
        State,
        Zip,
        Phone,
        ContactName,
        LocationHours,
    }
}

mod m20240101_000002_create_transaction_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_transaction_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(TransactionHeader::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionHeader::TransactionId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionHeader::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionHeader::TransactionDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionHeader::Warehouse).string().null())
                        .col(
                            ColumnDef::new(TransactionHeader::ReferenceType)
                                .string()
                                .null(),
                        )
                        // Uniqueness here is what turns the read-then-allocate
                        // race into a visible conflict.
                        .col(
                            ColumnDef::new(TransactionHeader::ReferenceNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(TransactionHeader::ShipmentCarrier)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(TransactionHeader::ShippingDocument)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(TransactionHeader::CustomerPo).string().null())
                        .col(
                            ColumnDef::new(TransactionHeader::CustomerName)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(TransactionHeader::Comments).string().null())
                        .col(
                            ColumnDef::new(TransactionHeader::RelatedTransactionId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(TransactionHeader::CreatedBy).uuid().null())
                        .col(ColumnDef::new(TransactionHeader::LastEditedBy).uuid().null())
                        .col(
                            ColumnDef::new(TransactionHeader::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionHeader::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_header_warehouse")
                        .table(TransactionHeader::Table)
                        .col(TransactionHeader::Warehouse)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_header_date")
                        .table(TransactionHeader::Table)
                        .col(TransactionHeader::TransactionDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_header_related")
                        .table(TransactionHeader::Table)
                        .col(TransactionHeader::RelatedTransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransactionDetail::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransactionDetail::DetailId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionDetail::TransactionId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionDetail::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(TransactionDetail::Quantity)
                                .decimal_len(19, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(TransactionDetail::InventoryStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransactionDetail::Status).string().not_null())
                        .col(ColumnDef::new(TransactionDetail::LotNumber).string().null())
                        .col(ColumnDef::new(TransactionDetail::Comments).string().null())
                        .col(ColumnDef::new(TransactionDetail::CreatedBy).uuid().null())
                        .col(ColumnDef::new(TransactionDetail::LastEditedBy).uuid().null())
                        .col(
                            ColumnDef::new(TransactionDetail::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(TransactionDetail::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transaction_detail_header")
                                .from(TransactionDetail::Table, TransactionDetail::TransactionId)
                                .to(TransactionHeader::Table, TransactionHeader::TransactionId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_detail_transaction_id")
                        .table(TransactionDetail::Table)
                        .col(TransactionDetail::TransactionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transaction_detail_item_name")
                        .table(TransactionDetail::Table)
                        .col(TransactionDetail::ItemName)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransactionDetail::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TransactionHeader::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum TransactionHeader {
        Table,
        TransactionId,
        TransactionType,
        TransactionDate,
        Warehouse,
        ReferenceType,
        ReferenceNumber,
        ShipmentCarrier,
        ShippingDocument,
        CustomerPo,
        CustomerName,
        Comments,
        RelatedTransactionId,
        CreatedBy,
        LastEditedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum TransactionDetail {
        Table,
        DetailId,
        TransactionId,
        ItemName,
        Quantity,
        InventoryStatus,
        Status,
        LotNumber,
        Comments,
        CreatedBy,
        LastEditedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_auth_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_auth_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AppUser::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AppUser::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(AppUser::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(AppUser::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(AppUser::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Profile::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Profile::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Profile::UserId).uuid().not_null())
                        .col(ColumnDef::new(Profile::Role).string().not_null())
                        .col(ColumnDef::new(Profile::DisplayName).string().null())
                        .col(
                            ColumnDef::new(Profile::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_profile_app_user")
                                .from(Profile::Table, Profile::UserId)
                                .to(AppUser::Table, AppUser::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_profile_user_id")
                        .table(Profile::Table)
                        .col(Profile::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ExcludedUser::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ExcludedUser::UserId)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ExcludedUser::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Profile::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(AppUser::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum AppUser {
        Table,
        Id,
        Email,
        PasswordHash,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Profile {
        Table,
        Id,
        UserId,
        Role,
        DisplayName,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ExcludedUser {
        Table,
        UserId,
    }
}

mod m20240101_000004_create_audit_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_audit_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(UserSession::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UserSession::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(UserSession::UserId).uuid().not_null())
                        .col(ColumnDef::new(UserSession::IpAddress).string().null())
                        .col(ColumnDef::new(UserSession::UserAgent).string().null())
                        .col(ColumnDef::new(UserSession::DeviceType).string().null())
                        .col(
                            ColumnDef::new(UserSession::StartedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(UserSession::EndedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_user_session_user_id")
                        .table(UserSession::Table)
                        .col(UserSession::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UserAction::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UserAction::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(UserAction::SessionId).uuid().not_null())
                        .col(ColumnDef::new(UserAction::ActionType).string().not_null())
                        .col(ColumnDef::new(UserAction::ActionDetails).json().not_null())
                        .col(
                            ColumnDef::new(UserAction::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_user_action_session")
                                .from(UserAction::Table, UserAction::SessionId)
                                .to(UserSession::Table, UserSession::Id),
                        )
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UserAction::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(UserSession::Table).to_owned())
                .await?;
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum UserSession {
        Table,
        Id,
        UserId,
        IpAddress,
        UserAgent,
        DeviceType,
        StartedAt,
        EndedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum UserAction {
        Table,
        Id,
        SessionId,
        ActionType,
        ActionDetails,
        CreatedAt,
    }
}

mod m20240101_000005_create_inventory_views {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_inventory_views"
        }
    }

    // Signed effect of a detail line on on-hand for one inventory status:
    // Inbound Received adds, Outbound Shipped subtracts, Completed
    // adjustments apply their signed quantity. Pending lines never touch
    // on-hand.
    const ON_HAND_DELTA: &str = r#"
        CASE WHEN h.transaction_type = 'Inbound' AND d.status = 'Received' THEN d.quantity
             WHEN h.transaction_type = 'Outbound' AND d.status = 'Shipped' THEN -d.quantity
             WHEN h.transaction_type = 'Adjustment' AND d.status = 'Completed' THEN d.quantity
             ELSE 0 END"#;

    fn status_delta(status: &str) -> String {
        format!(
            "SUM(CASE WHEN d.inventory_status = '{}' THEN {} ELSE 0 END)",
            status, ON_HAND_DELTA
        )
    }

    fn pending_sum(ttype: &str, status: &str) -> String {
        format!(
            "SUM(CASE WHEN h.transaction_type = '{}' AND d.status = 'Pending' AND d.inventory_status = '{}' THEN d.quantity ELSE 0 END)",
            ttype, status
        )
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let conn = manager.get_connection();

            // Flattened header+detail rows with creator/editor display names.
            conn.execute_unprepared(
                r#"
                CREATE VIEW vw_transaction_full AS
                SELECT
                    h.transaction_id,
                    h.transaction_type,
                    h.transaction_date,
                    h.reference_type,
                    h.reference_number,
                    h.customer_po,
                    h.customer_name,
                    h.warehouse,
                    h.shipment_carrier,
                    h.shipping_document,
                    h.comments AS header_comments,
                    h.related_transaction_id,
                    h.created_at AS header_created_at,
                    h.updated_at AS header_last_updated_at,
                    d.detail_id,
                    d.item_name,
                    d.quantity,
                    d.inventory_status,
                    d.lot_number,
                    d.comments AS detail_comments,
                    d.status AS detail_status,
                    h.created_by,
                    h.last_edited_by,
                    pc.display_name AS created_by_name,
                    pe.display_name AS last_edited_by_name
                FROM transaction_detail d
                JOIN transaction_header h ON h.transaction_id = d.transaction_id
                LEFT JOIN profile pc ON pc.user_id = h.created_by
                LEFT JOIN profile pe ON pe.user_id = h.last_edited_by
                "#,
            )
            .await?;

            // Running on-hand per (item, warehouse) at each transaction date.
            // The count workflow reads the latest row at or before its as-of
            // date.
            let snapshot_sql = format!(
                r#"
                CREATE VIEW transactions_inventory_snapshot_by_date AS
                SELECT
                    item_name,
                    warehouse,
                    transaction_date,
                    SUM(stock_delta) OVER w AS on_hand_stock,
                    SUM(consignment_delta) OVER w AS on_hand_consignment,
                    SUM(hold_delta) OVER w AS on_hand_hold,
                    SUM(stock_delta + consignment_delta + hold_delta) OVER w AS on_hand_total
                FROM (
                    SELECT
                        d.item_name,
                        h.warehouse,
                        h.transaction_date,
                        {stock} AS stock_delta,
                        {consignment} AS consignment_delta,
                        {hold} AS hold_delta
                    FROM transaction_detail d
                    JOIN transaction_header h ON h.transaction_id = d.transaction_id
                    WHERE h.warehouse IS NOT NULL
                    GROUP BY d.item_name, h.warehouse, h.transaction_date
                ) deltas
                WINDOW w AS (PARTITION BY item_name, warehouse ORDER BY transaction_date)
                "#,
                stock = status_delta("Stock"),
                consignment = status_delta("Consignment"),
                hold = status_delta("Hold"),
            );
            conn.execute_unprepared(&snapshot_sql).await?;

            // Current position per (item, warehouse): on-hand, pending
            // inbound (on-order), pending outbound (committed), and the
            // projected future position.
            let inventory_sql = format!(
                r#"
                CREATE VIEW inventory_view AS
                SELECT
                    d.item_name,
                    h.warehouse,
                    MAX(h.transaction_date) AS as_of_date,
                    {oh_stock} + {oh_consignment} + {oh_hold} AS on_hand_total,
                    {oh_stock} AS on_hand_stock,
                    {oh_consignment} AS on_hand_consignment,
                    {oh_hold} AS on_hand_hold,
                    {ib_stock} + {ib_consignment} + {ib_hold} AS inbound_total,
                    {ib_stock} AS inbound_stock,
                    {ib_consignment} AS inbound_consignment,
                    {ib_hold} AS inbound_hold,
                    {ob_stock} + {ob_consignment} + {ob_hold} AS scheduled_outbound_total,
                    {ob_stock} AS scheduled_outbound_stock,
                    {ob_consignment} AS scheduled_outbound_consignment,
                    {ob_hold} AS scheduled_outbound_hold,
                    {oh_stock} + {ib_stock} - {ob_stock}
                        + {oh_consignment} + {ib_consignment} - {ob_consignment}
                        + {oh_hold} + {ib_hold} - {ob_hold} AS future_total,
                    {oh_stock} + {ib_stock} - {ob_stock} AS future_stock,
                    {oh_consignment} + {ib_consignment} - {ob_consignment} AS future_consignment,
                    {oh_hold} + {ib_hold} - {ob_hold} AS future_hold
                FROM transaction_detail d
                JOIN transaction_header h ON h.transaction_id = d.transaction_id
                WHERE h.warehouse IS NOT NULL
                GROUP BY d.item_name, h.warehouse
                "#,
                oh_stock = status_delta("Stock"),
                oh_consignment = status_delta("Consignment"),
                oh_hold = status_delta("Hold"),
                ib_stock = pending_sum("Inbound", "Stock"),
                ib_consignment = pending_sum("Inbound", "Consignment"),
                ib_hold = pending_sum("Inbound", "Hold"),
                ob_stock = pending_sum("Outbound", "Stock"),
                ob_consignment = pending_sum("Outbound", "Consignment"),
                ob_hold = pending_sum("Outbound", "Hold"),
            );
            conn.execute_unprepared(&inventory_sql).await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let conn = manager.get_connection();
            conn.execute_unprepared("DROP VIEW IF EXISTS inventory_view")
                .await?;
            conn.execute_unprepared(
                "DROP VIEW IF EXISTS transactions_inventory_snapshot_by_date",
            )
            .await?;
            conn.execute_unprepared("DROP VIEW IF EXISTS vw_transaction_full")
                .await?;
            Ok(())
        }
    }
}
