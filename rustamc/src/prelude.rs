pub use crate::{
    data::{cashflow::*, cashflowinfo::*, currency::*, timegrid::*},
    engine::{amccalculator::*, config::*, multilegengine::*, pathvalue::*},
    math::{basis::*, regression::*},
    models::{gaussianmodel::*, montecarlomodel::*, sequences::*},
    utils::{errors::*, num::*},
};
