mod store;

pub use store::{
    FileBackend, MemoryBackend, ScopedStore, Storage, StoreBackend, StoreScope, LOCAL_STORE_FILE,
};
