use crate::bools::*;
use bitfield::bitfield;

bitfield! {
    pub struct ClauseHeader(u32);
    impl Debug;
    pub get_mark, set_mark :1, 0;
    pub get_learnt, set_learnt :2;
    pub get_extra_data, set_extra_data :3;
    pub get_reloced, set_reloced :4;
    pub get_size, set_size :31, 5;
}

/// Clause reference: an offset into the arena, or one of the negative
/// sentinels below.
pub type ClauseHeaderOffset = i32;
pub const CLAUSE_NONE: ClauseHeaderOffset = -1;

/// Arena of clauses in a single `Vec<u32>`: one header word, `size` literal
/// words, and for clauses with extra data one trailing word holding either
/// a learnt-clause activity (`f32`) or an abstraction bitmask (original
/// clauses, only when `extra_clause_field` is on).
pub struct ClauseDatabase {
    pub clause_data: Vec<u32>,
    pub wasted: u32,
    pub extra_clause_field: bool,
}

fn calc_abstraction(lits: &[Lit]) -> u32 {
    let mut abs = 0u32;
    for l in lits {
        abs |= 1 << (l.var().0 & 31);
    }
    abs
}

impl ClauseDatabase {
    pub fn new() -> Self {
        ClauseDatabase {
            clause_data: Vec::new(),
            wasted: 0,
            extra_clause_field: false,
        }
    }

    pub fn add_clause(&mut self, lits: &[Lit], learnt: bool) -> ClauseHeaderOffset {
        let extra = learnt || self.extra_clause_field;

        let mut header = ClauseHeader(0);
        header.set_size(lits.len() as u32);
        header.set_learnt(learnt);
        header.set_extra_data(extra);

        let cref = self.clause_data.len() as ClauseHeaderOffset;
        self.clause_data.push(header.0);
        self.clause_data
            .extend(lits.iter().map(|l| l.0 as u32));

        if learnt {
            self.clause_data.push(0f32.to_bits());
        } else if extra {
            self.clause_data.push(calc_abstraction(lits));
        }

        cref
    }

    /// Account a removed clause. The space is reclaimed on the next
    /// relocation pass.
    pub fn free(&mut self, cref: ClauseHeaderOffset) {
        let header = self.get_header(cref);
        self.wasted += 1 + header.get_size() + header.get_extra_data() as u32;
    }

    /// Copy a live clause into `new_data`, leaving a forwarding offset
    /// behind the `reloced` flag, and return the new address. Idempotent:
    /// an already-moved clause just returns its forwarding offset.
    pub fn relocate_clause(
        &mut self,
        cref: ClauseHeaderOffset,
        new_data: &mut Vec<u32>,
    ) -> ClauseHeaderOffset {
        let header = self.get_header(cref);
        if header.get_reloced() {
            return *self.get_relocated_address(cref);
        }

        let size_in_u32 = 1 + header.get_size() as usize + header.get_extra_data() as usize;
        let new_addr = new_data.len() as ClauseHeaderOffset;
        new_data.extend(&self.clause_data[cref as usize..(cref as usize + size_in_u32)]);

        self.get_header_mut(cref).set_reloced(true);
        *self.get_relocated_address(cref) = new_addr;

        new_addr
    }

    /// Shrink a clause in place (level-0 literal stripping). The extra-data
    /// word, if any, is moved down to sit right after the new last literal.
    pub fn update_size(&mut self, cref: ClauseHeaderOffset, new_size: usize) {
        let mut header = self.get_header(cref);
        if header.get_extra_data() {
            let extra_addr = cref as usize + 1 + header.get_size() as usize;
            self.clause_data[cref as usize + 1 + new_size] = self.clause_data[extra_addr];
        }
        self.wasted += (header.get_size() as usize - new_size) as u32;
        header.set_size(new_size as u32);
        *self.get_header_mut(cref) = header;
    }

    pub fn get_header(&self, header_addr: ClauseHeaderOffset) -> ClauseHeader {
        assert!(header_addr >= 0);
        ClauseHeader(self.clause_data[header_addr as usize])
    }

    pub fn get_header_mut<'a>(
        &'a mut self,
        header_addr: ClauseHeaderOffset,
    ) -> &'a mut ClauseHeader {
        assert!(header_addr >= 0);
        assert_eq!(
            std::mem::size_of::<ClauseHeader>(),
            std::mem::size_of::<u32>()
        );
        let val = &mut self.clause_data[header_addr as usize];
        unsafe { std::mem::transmute::<&mut u32, &mut ClauseHeader>(val) }
    }

    pub fn get_lits<'a>(&'a self, header_addr: ClauseHeaderOffset, size: usize) -> &'a [Lit] {
        unsafe {
            let ptr =
                (&self.clause_data[header_addr as usize] as *const u32 as *const Lit).offset(1);
            std::slice::from_raw_parts(ptr, size)
        }
    }

    pub fn get_lits_mut<'a>(
        &'a mut self,
        header_addr: ClauseHeaderOffset,
        size: usize,
    ) -> &'a mut [Lit] {
        unsafe {
            let ptr = (self.clause_data.get_mut(header_addr as usize).unwrap() as *mut u32
                as *mut Lit)
                .offset(1);
            std::slice::from_raw_parts_mut(ptr, size)
        }
    }

    pub fn get_clause<'a>(
        &'a self,
        header_addr: ClauseHeaderOffset,
    ) -> (ClauseHeader, &'a [Lit]) {
        let header = self.get_header(header_addr);
        let size = header.get_size() as usize;
        (header, self.get_lits(header_addr, size))
    }

    fn get_extra_address(&self, header_addr: ClauseHeaderOffset) -> usize {
        let header = self.get_header(header_addr);
        assert!(header.get_extra_data());
        header_addr as usize + 1 + header.get_size() as usize
    }

    pub fn get_activity(&self, header_addr: ClauseHeaderOffset) -> f32 {
        debug_assert!(self.get_header(header_addr).get_learnt());
        f32::from_bits(self.clause_data[self.get_extra_address(header_addr)])
    }

    pub fn set_activity(&mut self, header_addr: ClauseHeaderOffset, act: f32) {
        debug_assert!(self.get_header(header_addr).get_learnt());
        let addr = self.get_extra_address(header_addr);
        self.clause_data[addr] = act.to_bits();
    }

    pub fn get_abstraction(&self, header_addr: ClauseHeaderOffset) -> u32 {
        debug_assert!(!self.get_header(header_addr).get_learnt());
        self.clause_data[self.get_extra_address(header_addr)]
    }

    fn get_relocated_address<'a>(
        &'a mut self,
        header_addr: ClauseHeaderOffset,
    ) -> &'a mut ClauseHeaderOffset {
        unsafe {
            let ptr = (self.clause_data.get_mut(header_addr as usize).unwrap() as *mut u32
                as *mut ClauseHeaderOffset)
                .offset(1);
            &mut *ptr
        }
    }
}
