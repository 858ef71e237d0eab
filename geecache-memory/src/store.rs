use hashbrown::HashMap;

use geecache_common::Value;

struct Node {
    key: String,
    value: Value,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A single-threaded, byte-accounted LRU container.
///
/// Unlike an intrusive pointer-based list, residency here is tracked
/// with an arena (`Vec<Option<Node>>`) addressed by index, plus a free
/// list for reclaimed slots. `index` maps a key to its arena slot so
/// `get`/`add` are O(1) expected; `head` is the most-recently-used
/// slot and `tail` the least.
pub struct Store {
    max_bytes: i64,
    current_bytes: i64,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    on_evicted: Option<Box<dyn FnMut(&str, &Value) + Send>>,
}

impl Store {
    /// `max_bytes` of zero disables eviction.
    pub fn new(max_bytes: i64) -> Self {
        Store {
            max_bytes,
            current_bytes: 0,
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            on_evicted: None,
        }
    }

    pub fn with_on_evicted(
        max_bytes: i64,
        on_evicted: Box<dyn FnMut(&str, &Value) + Send>,
    ) -> Self {
        let mut store = Self::new(max_bytes);
        store.on_evicted = Some(on_evicted);
        store
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn current_bytes(&self) -> i64 {
        self.current_bytes
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        self.nodes[idx].as_ref().map(|n| n.value.clone())
    }

    pub fn add(&mut self, key: &str, value: Value) {
        if let Some(&idx) = self.index.get(key) {
            let old_len = self.nodes[idx].as_ref().unwrap().value.len() as i64;
            self.current_bytes += value.len() as i64 - old_len;
            self.nodes[idx].as_mut().unwrap().value = value;
            self.move_to_front(idx);
        } else {
            self.current_bytes += key.len() as i64 + value.len() as i64;
            let idx = self.alloc(Node {
                key: key.to_string(),
                value,
                prev: None,
                next: self.head,
            });
            if let Some(head) = self.head {
                self.nodes[head].as_mut().unwrap().prev = Some(idx);
            }
            self.head = Some(idx);
            if self.tail.is_none() {
                self.tail = Some(idx);
            }
            self.index.insert(key.to_string(), idx);
        }

        while self.max_bytes > 0 && self.current_bytes > self.max_bytes {
            if self.evict_oldest().is_none() {
                break;
            }
        }
    }

    /// Removes the least-recently-used entry. Returns `None` if empty.
    pub fn evict_oldest(&mut self) -> Option<(String, Value)> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.free(idx);
        self.index.remove(&node.key);
        self.current_bytes -= node.key.len() as i64 + node.value.len() as i64;
        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&node.key, &node.value);
        }
        Some((node.key, node.value))
    }

    fn alloc(&mut self, node: Node) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free(&mut self, idx: usize) -> Node {
        let node = self.nodes[idx].take().expect("double free of lru node");
        self.free.push(idx);
        node
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().unwrap();
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        let old_head = self.head;
        {
            let node = self.nodes[idx].as_mut().unwrap();
            node.prev = None;
            node.next = old_head;
        }
        if let Some(head) = old_head {
            self.nodes[head].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }
}
