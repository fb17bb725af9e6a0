pub async fn index() -> &'static str {
    "Cinema booking API"
}
