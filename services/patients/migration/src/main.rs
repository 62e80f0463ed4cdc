use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(clinic_patients_migration::Migrator).await;
}
