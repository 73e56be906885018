use super::ListPage;
use crate::webtoon::Webtoon;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct RawListResponse {
    pub data: ListPage,
}

#[derive(Deserialize, Debug)]
pub struct RawResultsResponse {
    pub data: Results,
}

#[derive(Deserialize, Debug)]
pub struct Results {
    #[serde(default)]
    pub results: Vec<Webtoon>,
}

#[derive(Serialize, Debug)]
pub struct SearchQuery<'a> {
    pub search: &'a str,
}

#[derive(Serialize, Debug)]
pub struct RecentlyPaidQuery {
    pub page: u32,
}
