//! Integration tests: full fetch → extract → cache → sensor pipeline.

mod end_to_end;
mod mock_site;
