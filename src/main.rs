#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    pdf_template_server::run().await
}
