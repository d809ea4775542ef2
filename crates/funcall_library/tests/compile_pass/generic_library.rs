use funcall_library::{FunctionLibrary, function, library};
use std::sync::Mutex;

struct Store<T> {
    items: Mutex<Vec<T>>,
}

#[library]
impl<T> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Count stored items.
    #[function]
    fn count(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// Clear the store.
    #[function(description = "Remove every item.")]
    fn clear(&self) {
        if let Ok(mut items) = self.items.lock() {
            items.clear();
        }
    }

    fn not_exposed(&self) -> Option<T> {
        self.items.lock().ok()?.first().cloned()
    }
}

fn main() {
    let store = Store {
        items: Mutex::new(vec![1_u8, 2, 3]),
    };
    assert_eq!(store.not_exposed(), Some(1));
    let library = FunctionLibrary::new(store).unwrap();
    assert_eq!(library.names(), ["count", "clear"]);
    assert_eq!(library.get("clear").unwrap().description(), "Remove every item.");
}
