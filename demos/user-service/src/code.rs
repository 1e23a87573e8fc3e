use tessera::prelude::Code;

pub const ERR_CODE_101_DATA_FETCH_FAILED: Code = Code::new("us101e", "Data fetch failed");
